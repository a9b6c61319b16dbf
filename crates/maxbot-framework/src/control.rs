use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared running flag of a polling loop.
///
/// Cloning yields another handle to the same flag. [`stop`](Self::stop) only
/// clears the flag; the loop notices it at its next iteration boundary, so
/// it is safe to call from inside a handler.
#[derive(Debug, Clone, Default)]
pub struct BotControl {
    running: Arc<AtomicBool>,
}

impl BotControl {
    /// Creates a handle in the stopped state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the loop to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Returns `true` while the loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Marks the loop as running. Returns `false` if it already was.
    pub fn try_start(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
