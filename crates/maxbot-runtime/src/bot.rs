//! The bot engine.
//!
//! A [`Bot`] ties a [`PlatformClient`] to a [`Dispatcher`] and drives it,
//! either from its own long-poll loop ([`Bot::start`]) or from updates pushed
//! by the application ([`Bot::process_update`], [`Bot::handle_webhook`]).
//!
//! # Polling loop
//!
//! ```text
//!            ┌──────────── running? ────────────┐
//!            │ no                               │ yes
//!            ▼                                  ▼
//!         Stopped                 get_updates(limit, timeout, marker, types)
//!                                      │ Ok                      │ Err
//!                                      ▼                         ▼
//!                         advance marker if present     error handler, else
//!                         dispatch each update in order log + retry delay
//!                                      │                         │
//!                                      └───────────┬─────────────┘
//!                                                  ▼
//!                                            next iteration
//! ```
//!
//! The loop checks its running flag once per iteration, so [`Bot::stop`] is
//! safe to call from inside a handler: the current batch is drained, then
//! the loop exits without fetching again.
//!
//! # Example
//!
//! ```rust,ignore
//! let bot = Bot::from_token(std::env::var("MAXBOT_TOKEN")?)?;
//!
//! bot.on_command("start", |message: Message, api: Api| async move {
//!     let chat_id = message.chat_id().unwrap_or_default();
//!     api.call(
//!         ApiRequest::post("messages")
//!             .query("chat_id", chat_id)
//!             .body(json!({ "text": "Hello!" })),
//!     )
//!     .await?;
//!     Ok::<_, BoxError>(())
//! });
//!
//! bot.run().await?;
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tracing::{debug, error, info, trace, warn};

use maxbot_core::{AttachmentKind, PlatformClient, Update, UpdateType, UpdatesRequest};
use maxbot_framework::filter::{self, CallbackPattern};
use maxbot_framework::{
    BotControl, BoxedHandler, Dispatcher, Handler, HandlerResult, Middleware, UpdateContext,
    compile_pattern, into_handler,
};

use crate::config::PollingConfig;
use crate::error::{PollError, RuntimeError, RuntimeResult};
use crate::webhook;

/// Callback receiving polling loop failures.
pub type ErrorHandler = Arc<dyn Fn(PollError) -> BoxFuture<'static, ()> + Send + Sync>;

/// Tunables of the polling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    /// Maximum updates per request.
    pub limit: u32,
    /// Long-poll timeout used by [`Bot::run`], in seconds.
    pub timeout_secs: u32,
    /// Pause after a failed fetch when no error handler is installed.
    pub retry_delay: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollSettings {
    fn from(config: &PollingConfig) -> Self {
        Self {
            limit: config.limit,
            timeout_secs: config.timeout_secs,
            retry_delay: config.retry_delay(),
        }
    }
}

struct BotInner {
    client: Arc<dyn PlatformClient>,
    dispatcher: Dispatcher,
    control: BotControl,
    marker: Mutex<Option<i64>>,
    error_handler: RwLock<Option<ErrorHandler>>,
    settings: RwLock<PollSettings>,
    abandon_fetch: Notify,
}

/// A bot: handlers, middleware, cursor and polling loop.
///
/// Cloning is cheap; clones share all state.
#[derive(Clone)]
pub struct Bot {
    inner: Arc<BotInner>,
}

impl Bot {
    /// Creates a bot on top of `client`.
    pub fn new<C: PlatformClient + 'static>(client: C) -> Self {
        Self::with_client(Arc::new(client))
    }

    /// Creates a bot sharing an existing client.
    pub fn with_client(client: Arc<dyn PlatformClient>) -> Self {
        Self {
            inner: Arc::new(BotInner {
                client,
                dispatcher: Dispatcher::new(),
                control: BotControl::new(),
                marker: Mutex::new(None),
                error_handler: RwLock::new(None),
                settings: RwLock::new(PollSettings::default()),
                abandon_fetch: Notify::new(),
            }),
        }
    }

    /// Creates a bot talking to the production API with `token`.
    #[cfg(feature = "http-client")]
    pub fn from_token(token: impl Into<String>) -> RuntimeResult<Self> {
        let client = maxbot_transport::HttpClient::new(token)?;
        Ok(Self::new(client))
    }

    /// Creates a bot from configuration.
    ///
    /// Validates the configuration, installs logging, builds the HTTP client
    /// and applies the polling settings and initial marker.
    #[cfg(feature = "http-client")]
    pub fn from_config(config: &crate::config::MaxbotConfig) -> RuntimeResult<Self> {
        crate::config::validate_config(config)?;
        crate::logging::init_from_config(&config.logging);

        let client = maxbot_transport::HttpClient::builder(config.api.token.as_str())
            .base_url(config.api.base_url.as_str())
            .timeout(config.api.request_timeout())
            .build()?;

        let bot = Self::new(client);
        bot.set_poll_settings(PollSettings::from(&config.polling));
        bot.set_marker(config.polling.marker);

        info!(
            base_url = %config.api.base_url,
            poll_timeout = config.polling.timeout_secs,
            marker = ?config.polling.marker,
            "Bot initialized from configuration"
        );
        Ok(bot)
    }

    /// Loads configuration from the default locations and builds a bot.
    #[cfg(feature = "http-client")]
    pub fn load() -> RuntimeResult<Self> {
        let config = crate::config::ConfigLoader::new().load()?;
        Self::from_config(&config)
    }

    /// Returns the client, for one-shot API calls outside handlers.
    pub fn client(&self) -> &Arc<dyn PlatformClient> {
        &self.inner.client
    }

    /// Returns the dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    pub fn poll_settings(&self) -> PollSettings {
        self.inner.settings.read().clone()
    }

    pub fn set_poll_settings(&self, settings: PollSettings) -> &Self {
        *self.inner.settings.write() = settings;
        self
    }

    // ─── Registration ───────────────────────────────────────────────────────

    /// Registers a handler for every update of `update_type`.
    pub fn on<H, T>(&self, update_type: UpdateType, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.register(update_type, into_handler(handler))
    }

    /// Registers an already boxed handler.
    pub fn register(&self, update_type: UpdateType, handler: BoxedHandler) -> &Self {
        debug!(update_type = %update_type, "Registering handler");
        self.inner.dispatcher.register(update_type, handler);
        self
    }

    /// New messages.
    pub fn on_message<H, T>(&self, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.on(UpdateType::MessageCreated, handler)
    }

    pub fn on_message_edited<H, T>(&self, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.on(UpdateType::MessageEdited, handler)
    }

    pub fn on_message_removed<H, T>(&self, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.on(UpdateType::MessageRemoved, handler)
    }

    /// Every inline button press.
    pub fn on_callback<H, T>(&self, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.on(UpdateType::MessageCallback, handler)
    }

    /// Button presses whose payload matches `pattern`.
    ///
    /// A pattern starting with `/` (and longer than that) is a regular
    /// expression, optionally with trailing flags (`/^buy_(\d+)$/i`), whose
    /// groups the handler can extract as
    /// [`Captures`](maxbot_framework::Captures). Anything else must equal the
    /// payload exactly.
    pub fn on_callback_query<H, T>(&self, pattern: &str, handler: H) -> RuntimeResult<&Self>
    where
        H: Handler<T>,
        T: 'static,
    {
        let pattern = CallbackPattern::parse(pattern)?;
        Ok(self.register(
            UpdateType::MessageCallback,
            filter::callback_query(pattern, handler),
        ))
    }

    /// Messages whose first word is `/command`, compared case-insensitively.
    ///
    /// The leading slash is optional. The handler can extract the remaining
    /// words as [`CommandArgs`](maxbot_framework::CommandArgs).
    pub fn on_command<H, T>(&self, command: &str, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.register(UpdateType::MessageCreated, filter::command(command, handler))
    }

    /// Messages whose text matches the regular expression `pattern`.
    pub fn on_text<H, T>(&self, pattern: &str, handler: H) -> RuntimeResult<&Self>
    where
        H: Handler<T>,
        T: 'static,
    {
        let regex = compile_pattern(pattern)?;
        Ok(self.register(UpdateType::MessageCreated, filter::text(regex, handler)))
    }

    /// Messages carrying at least one attachment of `kind`.
    pub fn on_attachment<H, T>(&self, kind: AttachmentKind, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.register(
            UpdateType::MessageCreated,
            filter::attachment(kind, handler),
        )
    }

    pub fn on_photo<H, T>(&self, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.on_attachment(AttachmentKind::Image, handler)
    }

    pub fn on_video<H, T>(&self, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.on_attachment(AttachmentKind::Video, handler)
    }

    pub fn on_audio<H, T>(&self, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.on_attachment(AttachmentKind::Audio, handler)
    }

    pub fn on_file<H, T>(&self, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.on_attachment(AttachmentKind::File, handler)
    }

    pub fn on_sticker<H, T>(&self, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.on_attachment(AttachmentKind::Sticker, handler)
    }

    pub fn on_location<H, T>(&self, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.on_attachment(AttachmentKind::Location, handler)
    }

    pub fn on_contact<H, T>(&self, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.on_attachment(AttachmentKind::Contact, handler)
    }

    pub fn on_share<H, T>(&self, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.on_attachment(AttachmentKind::Share, handler)
    }

    /// A user joined a chat.
    pub fn on_user_joined<H, T>(&self, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.on(UpdateType::UserAdded, handler)
    }

    /// A user left or was removed from a chat.
    pub fn on_user_removed<H, T>(&self, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.on(UpdateType::UserRemoved, handler)
    }

    pub fn on_bot_added<H, T>(&self, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.on(UpdateType::BotAdded, handler)
    }

    pub fn on_bot_removed<H, T>(&self, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.on(UpdateType::BotRemoved, handler)
    }

    /// A user opened a dialog with the bot.
    pub fn on_bot_started<H, T>(&self, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.on(UpdateType::BotStarted, handler)
    }

    pub fn on_bot_stopped<H, T>(&self, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.on(UpdateType::BotStopped, handler)
    }

    pub fn on_chat_title_changed<H, T>(&self, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.on(UpdateType::ChatTitleChanged, handler)
    }

    /// Updates whose type this library does not recognise.
    ///
    /// Registering one of these disables the server-side type filter so that
    /// such updates can reach the bot at all.
    pub fn on_unknown<H, T>(&self, handler: H) -> &Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.on(UpdateType::Unknown, handler)
    }

    /// Appends a middleware stage.
    pub fn use_middleware<M: Middleware>(&self, middleware: M) -> &Self {
        self.inner.dispatcher.add_middleware(Arc::new(middleware));
        self
    }

    /// Installs the polling loop error handler, replacing any previous one.
    ///
    /// With a handler installed, failed fetches are retried immediately.
    pub fn on_error<F, Fut>(&self, handler: F) -> &Self
    where
        F: Fn(PollError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: ErrorHandler =
            Arc::new(move |e: PollError| -> BoxFuture<'static, ()> { Box::pin(handler(e)) });
        *self.inner.error_handler.write() = Some(handler);
        self
    }

    // ─── Cursor ─────────────────────────────────────────────────────────────

    /// Sets the cursor the next poll resumes from.
    pub fn set_marker(&self, marker: Option<i64>) -> &Self {
        *self.inner.marker.lock() = marker;
        self
    }

    /// Returns the current cursor, for persisting across restarts.
    pub fn marker(&self) -> Option<i64> {
        *self.inner.marker.lock()
    }

    // ─── Polling ────────────────────────────────────────────────────────────

    pub fn control(&self) -> BotControl {
        self.inner.control.clone()
    }

    /// Asks the polling loop to exit at its next iteration boundary.
    pub fn stop(&self) {
        if self.inner.control.is_running() {
            info!("Stopping polling loop");
        }
        self.inner.control.stop();
    }

    pub fn is_running(&self) -> bool {
        self.inner.control.is_running()
    }

    /// The update types sent as the server-side filter.
    ///
    /// `None` (no filter) when nothing is registered, or when a catch-all
    /// [`UpdateType::Unknown`] handler needs to see unrecognised types.
    pub fn subscribed_types(&self) -> Option<Vec<UpdateType>> {
        let types = self.inner.dispatcher.registered_types();
        if types.is_empty() || types.contains(&UpdateType::Unknown) {
            None
        } else {
            Some(types)
        }
    }

    /// Runs the long-poll loop until [`stop`](Self::stop) is called.
    ///
    /// `timeout_secs` is how long the server may hold each request open.
    /// Returns [`RuntimeError::AlreadyRunning`] if the loop is already
    /// running.
    pub async fn start(&self, timeout_secs: u32) -> RuntimeResult<()> {
        if !self.inner.control.try_start() {
            return Err(RuntimeError::AlreadyRunning);
        }

        info!(timeout_secs, marker = ?self.marker(), "Polling started");
        while self.inner.control.is_running() {
            self.poll_once(timeout_secs).await;
        }
        info!(marker = ?self.marker(), "Polling stopped");
        Ok(())
    }

    /// Runs the loop with the configured timeout until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs the loop with the configured timeout until `shutdown` resolves.
    ///
    /// Shutdown stops the loop and waits for the batch being dispatched to
    /// finish. A long poll still waiting for the server is abandoned; nothing
    /// was received from it, so the marker is unaffected.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let timeout = self.poll_settings().timeout_secs;
        let polling = self.start(timeout);
        tokio::pin!(polling);

        tokio::select! {
            biased;
            result = &mut polling => return result,
            () = shutdown => {}
        }

        self.stop();
        self.inner.abandon_fetch.notify_waiters();
        polling.await
    }

    async fn poll_once(&self, timeout_secs: u32) {
        let settings = self.poll_settings();
        let request = UpdatesRequest {
            limit: settings.limit,
            timeout: timeout_secs,
            marker: self.marker(),
            types: self.subscribed_types(),
        };
        trace!(marker = ?request.marker, types = ?request.types_param(), "Fetching updates");

        // Registered before the running check so a shutdown between the two
        // is not missed.
        let abandoned = self.inner.abandon_fetch.notified();
        tokio::pin!(abandoned);
        abandoned.as_mut().enable();
        if !self.inner.control.is_running() {
            return;
        }

        let fetched = tokio::select! {
            biased;
            result = self.inner.client.get_updates(&request) => result,
            () = &mut abandoned => {
                debug!("Shutting down, abandoning pending poll");
                return;
            }
        };

        let response = match fetched {
            Ok(response) => response,
            Err(e) => {
                self.report(PollError::Fetch(e), Some(settings.retry_delay))
                    .await;
                return;
            }
        };

        if let Some(marker) = response.marker {
            *self.inner.marker.lock() = Some(marker);
        }
        if !response.updates.is_empty() {
            debug!(
                count = response.updates.len(),
                marker = ?response.marker,
                "Received updates"
            );
        }

        for update in response.updates {
            let update_type = update.update_type;
            if let Err(source) = self.dispatch(update).await {
                self.report(PollError::Handler { update_type, source }, None)
                    .await;
            }
        }
    }

    async fn report(&self, error: PollError, retry_delay: Option<Duration>) {
        let handler = self.inner.error_handler.read().clone();
        match handler {
            Some(handler) => handler(error).await,
            None => {
                error!(error = %error, "Polling error");
                if let Some(delay) = retry_delay {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    // ─── Injection ──────────────────────────────────────────────────────────

    fn dispatch(&self, update: Update) -> impl Future<Output = HandlerResult> + Send + 'static {
        let ctx = UpdateContext::new(
            update,
            Arc::clone(&self.inner.client),
            self.inner.control.clone(),
        );
        let dispatcher = self.inner.dispatcher.clone();
        async move { dispatcher.dispatch(Arc::new(ctx)).await }
    }

    /// Runs one update through the middleware and handlers.
    ///
    /// Errors from handlers or middleware are returned to the caller.
    pub async fn process_update(&self, update: Update) -> RuntimeResult<()> {
        self.dispatch(update).await.map_err(RuntimeError::Handler)
    }

    /// Decodes a webhook body and processes every update in it, in order.
    ///
    /// Returns the number of updates processed. An empty body is not an
    /// error. Processing stops at the first handler error.
    pub async fn handle_webhook(&self, body: &[u8]) -> RuntimeResult<usize> {
        let updates = webhook::decode_payload(body)?;
        let count = updates.len();
        for update in updates {
            self.process_update(update).await?;
        }
        Ok(count)
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("running", &self.is_running())
            .field("marker", &self.marker())
            .field("dispatcher", &self.inner.dispatcher)
            .field("settings", &*self.inner.settings.read())
            .finish_non_exhaustive()
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Cannot listen for SIGTERM, waiting for Ctrl+C only"),
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Cannot listen for Ctrl+C"),
    }
}

// =============================================================================
// Tower Service
// =============================================================================

impl tower::Service<Update> for Bot {
    type Response = ();
    type Error = RuntimeError;
    type Future = BoxFuture<'static, RuntimeResult<()>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, update: Update) -> Self::Future {
        let bot = self.clone();
        Box::pin(async move { bot.process_update(update).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use maxbot_core::{ApiError, ApiResult, Message, UpdatesResponse};
    use maxbot_framework::{BoxError, Captures, CommandArgs, Next};
    use serde_json::json;
    use tower::ServiceExt;

    /// Replays canned responses, then stops the bot.
    struct ScriptedClient {
        script: Mutex<VecDeque<ApiResult<UpdatesResponse>>>,
        requests: Mutex<Vec<UpdatesRequest>>,
        control: Mutex<Option<BotControl>>,
    }

    #[async_trait]
    impl PlatformClient for ScriptedClient {
        async fn get_updates(&self, request: &UpdatesRequest) -> ApiResult<UpdatesResponse> {
            self.requests.lock().push(request.clone());
            let next = self.script.lock().pop_front();
            next.unwrap_or_else(|| {
                if let Some(control) = self.control.lock().as_ref() {
                    control.stop();
                }
                Ok(UpdatesResponse::default())
            })
        }
    }

    fn scripted(script: Vec<ApiResult<UpdatesResponse>>) -> (Bot, Arc<ScriptedClient>) {
        let client = Arc::new(ScriptedClient {
            script: Mutex::new(script.into()),
            requests: Mutex::default(),
            control: Mutex::default(),
        });
        let bot = Bot::with_client(client.clone());
        *client.control.lock() = Some(bot.control());
        (bot, client)
    }

    fn message(timestamp: i64, text: &str) -> Update {
        Update::from_value(json!({
            "update_type": "message_created",
            "timestamp": timestamp,
            "message": {
                "sender": {"user_id": 1, "first_name": "Ann"},
                "recipient": {"chat_id": 10},
                "body": {"mid": format!("mid.{timestamp}"), "text": text}
            }
        }))
        .unwrap()
    }

    fn page(marker: Option<i64>, updates: Vec<Update>) -> ApiResult<UpdatesResponse> {
        Ok(UpdatesResponse { updates, marker })
    }

    fn server_error() -> ApiResult<UpdatesResponse> {
        Err(ApiError::Status {
            status: 502,
            body: "bad gateway".into(),
        })
    }

    type Log = Arc<Mutex<Vec<String>>>;

    fn record_texts(bot: &Bot, log: &Log) {
        let log = log.clone();
        bot.on_message(move |message: Message| {
            let log = log.clone();
            async move {
                log.lock().push(message.text().unwrap_or_default().to_string());
            }
        });
    }

    #[tokio::test]
    async fn test_batch_order_and_fetch_then_drain() {
        let (bot, client) = scripted(vec![
            page(Some(1), vec![message(1, "a"), message(2, "b")]),
            page(Some(2), vec![message(3, "c")]),
        ]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let c = client.clone();
        bot.on_message(move |message: Message| {
            let s = s.clone();
            let fetched = c.requests.lock().len();
            async move {
                s.lock().push((message.text().unwrap_or_default().to_string(), fetched));
            }
        });

        tokio_test::assert_ok!(bot.start(30).await);

        assert_eq!(
            *seen.lock(),
            vec![("a".to_string(), 1), ("b".to_string(), 1), ("c".to_string(), 2)]
        );
        assert!(!bot.is_running());
    }

    #[tokio::test]
    async fn test_marker_is_monotonic() {
        let (bot, client) = scripted(vec![
            page(Some(5), vec![]),
            page(None, vec![]),
            page(Some(6), vec![]),
        ]);
        bot.set_marker(Some(3));

        bot.start(25).await.unwrap();

        let requests = client.requests.lock();
        let markers: Vec<_> = requests.iter().map(|r| r.marker).collect();
        assert_eq!(markers, vec![Some(3), Some(5), Some(5), Some(6)]);
        assert!(requests.iter().all(|r| r.timeout == 25 && r.limit == 100));
        assert_eq!(bot.marker(), Some(6));
    }

    #[tokio::test]
    async fn test_stop_from_handler_drains_batch() {
        let (bot, client) = scripted(vec![
            page(Some(1), vec![message(1, "/stop"), message(2, "after")]),
            page(Some(2), vec![message(3, "never")]),
        ]);

        let log: Log = Arc::default();
        record_texts(&bot, &log);
        bot.on_command("stop", |control: BotControl| async move { control.stop() });

        bot.start(30).await.unwrap();

        assert_eq!(*log.lock(), vec!["/stop", "after"]);
        assert_eq!(client.requests.lock().len(), 1);
        assert_eq!(bot.marker(), Some(1));
    }

    #[tokio::test]
    async fn test_start_while_running() {
        let (bot, _client) = scripted(vec![]);
        assert!(bot.control().try_start());
        assert!(matches!(bot.start(30).await, Err(RuntimeError::AlreadyRunning)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_goes_to_error_handler() {
        let (bot, client) = scripted(vec![server_error(), page(Some(9), vec![message(1, "a")])]);
        bot.set_marker(Some(4));

        let errors: Log = Arc::default();
        let e = errors.clone();
        bot.on_error(move |error: PollError| {
            let e = e.clone();
            async move {
                assert!(error.is_fetch());
                e.lock().push(error.to_string());
            }
        });
        let log: Log = Arc::default();
        record_texts(&bot, &log);

        let started = tokio::time::Instant::now();
        bot.start(30).await.unwrap();

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(errors.lock().len(), 1);
        assert!(errors.lock()[0].contains("502"));
        assert_eq!(*log.lock(), vec!["a"]);
        let markers: Vec<_> = client.requests.lock().iter().map(|r| r.marker).collect();
        assert_eq!(markers, vec![Some(4), Some(4), Some(9)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_without_handler_waits() {
        let (bot, client) = scripted(vec![server_error()]);

        let started = tokio::time::Instant::now();
        bot.start(30).await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(client.requests.lock().len(), 2);
        assert_eq!(bot.marker(), None);
    }

    #[tokio::test]
    async fn test_handler_error_is_reported_and_loop_continues() {
        let (bot, _client) = scripted(vec![page(
            Some(1),
            vec![message(1, "/fail"), message(2, "ok")],
        )]);

        let log: Log = Arc::default();
        record_texts(&bot, &log);
        bot.on_command("fail", || async { Err::<(), BoxError>("handler blew up".into()) });

        let errors = Arc::new(Mutex::new(Vec::new()));
        let e = errors.clone();
        bot.on_error(move |error: PollError| {
            let e = e.clone();
            async move {
                if let PollError::Handler { update_type, source } = error {
                    e.lock().push((update_type, source.to_string()));
                }
            }
        });

        bot.start(30).await.unwrap();

        assert_eq!(*log.lock(), vec!["/fail", "ok"]);
        assert_eq!(
            *errors.lock(),
            vec![(UpdateType::MessageCreated, "handler blew up".to_string())]
        );
    }

    #[tokio::test]
    async fn test_type_filter_follows_registrations() {
        let (bot, client) = scripted(vec![page(None, vec![])]);
        assert_eq!(bot.subscribed_types(), None);

        bot.on_bot_started(|| async {});
        bot.on_callback(|| async {});
        bot.on_message(|| async {});

        bot.start(30).await.unwrap();
        assert_eq!(
            client.requests.lock()[0].types,
            Some(vec![
                UpdateType::MessageCreated,
                UpdateType::MessageCallback,
                UpdateType::BotStarted
            ])
        );

        bot.on_unknown(|| async {});
        assert_eq!(bot.subscribed_types(), None);
    }

    #[tokio::test]
    async fn test_command_end_to_end() {
        let (bot, _client) = scripted(vec![]);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let c = calls.clone();
        bot.on_command("start", move |args: CommandArgs| {
            let c = c.clone();
            async move {
                c.lock().push(args.into_inner());
            }
        });

        bot.process_update(message(1, "/start")).await.unwrap();
        bot.process_update(message(2, "hello")).await.unwrap();

        assert_eq!(*calls.lock(), vec![Vec::<String>::new()]);
    }

    #[tokio::test]
    async fn test_middleware_wraps_process_update() {
        let (bot, _client) = scripted(vec![]);
        let log: Log = Arc::default();

        for name in ["A", "B"] {
            let log = log.clone();
            bot.use_middleware(move |ctx: Arc<UpdateContext>, next: Next| {
                let log = log.clone();
                async move {
                    log.lock().push(format!("{name}-before"));
                    let result = next.run(ctx).await;
                    log.lock().push(format!("{name}-after"));
                    result
                }
            });
        }
        let l = log.clone();
        bot.on_message(move || {
            let l = l.clone();
            async move {
                l.lock().push("dispatch".to_string());
            }
        });

        bot.process_update(message(1, "hi")).await.unwrap();
        assert_eq!(
            *log.lock(),
            vec!["A-before", "B-before", "dispatch", "B-after", "A-after"]
        );
    }

    #[tokio::test]
    async fn test_process_update_returns_handler_error() {
        let (bot, _client) = scripted(vec![]);
        bot.on_message(|| async { Err::<(), BoxError>("nope".into()) });

        let err = bot.process_update(message(1, "hi")).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Handler(_)));
    }

    #[tokio::test]
    async fn test_handle_webhook_batch() {
        let (bot, _client) = scripted(vec![]);
        let log: Log = Arc::default();

        let l = log.clone();
        bot.use_middleware(move |ctx: Arc<UpdateContext>, next: Next| {
            let l = l.clone();
            async move {
                l.lock().push(format!("mw:{}", ctx.update().text().unwrap_or_default()));
                next.run(ctx).await
            }
        });
        record_texts(&bot, &log);

        let body = json!({"updates": [message(1, "one").raw(), message(2, "two").raw()]});
        let count = bot
            .handle_webhook(body.to_string().as_bytes())
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(*log.lock(), vec!["mw:one", "one", "mw:two", "two"]);
        assert_eq!(bot.handle_webhook(b"").await.unwrap(), 0);
        assert_eq!(log.lock().len(), 4);
    }

    #[tokio::test]
    async fn test_unknown_update_reaches_catch_all() {
        let (bot, _client) = scripted(vec![]);
        let names = Arc::new(Mutex::new(Vec::new()));
        let n = names.clone();
        bot.on_unknown(move |update: Arc<Update>| {
            let n = n.clone();
            async move {
                n.lock().push(update.type_name().to_string());
            }
        });
        let messages = Arc::new(AtomicUsize::new(0));
        let m = messages.clone();
        bot.on_message(move || {
            let m = m.clone();
            async move {
                m.fetch_add(1, Ordering::SeqCst);
            }
        });

        let update =
            Update::from_value(json!({"update_type": "totally_unknown", "timestamp": 1})).unwrap();
        bot.process_update(update).await.unwrap();

        assert_eq!(*names.lock(), vec!["totally_unknown"]);
        assert_eq!(messages.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_callback_query_patterns() {
        let (bot, _client) = scripted(vec![]);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = seen.clone();
        bot.on_callback_query(r"/^buy_(\d+)$/", move |caps: Captures| {
            let s = s.clone();
            async move {
                s.lock().push(format!("buy {}", caps.get(1).unwrap_or_default()));
            }
        })
        .unwrap();
        let s = seen.clone();
        bot.on_callback_query("help", move || {
            let s = s.clone();
            async move {
                s.lock().push("help".to_string());
            }
        })
        .unwrap();

        for payload in ["buy_42", "help", "sell_1"] {
            let update = Update::from_value(json!({
                "update_type": "message_callback",
                "timestamp": 1,
                "callback": {"callback_id": "cb", "payload": payload}
            }))
            .unwrap();
            bot.process_update(update).await.unwrap();
        }

        assert_eq!(*seen.lock(), vec!["buy 42", "help"]);
        assert!(matches!(
            bot.on_callback_query("/(/", || async {}),
            Err(RuntimeError::Pattern(_))
        ));
    }

    #[tokio::test]
    async fn test_tower_service() {
        let (bot, _client) = scripted(vec![]);
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        bot.on_message(move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio_test::assert_ok!(bot.clone().oneshot(message(1, "hi")).await);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_until_stops_loop() {
        let (bot, _client) = scripted(vec![]);
        bot.run_until(async {}).await.unwrap();
        assert!(!bot.is_running());
    }

    /// Serves one batch, then holds every later poll open forever.
    struct StallingClient {
        batch: Mutex<Option<UpdatesResponse>>,
        polls: AtomicUsize,
    }

    #[async_trait]
    impl PlatformClient for StallingClient {
        async fn get_updates(&self, _request: &UpdatesRequest) -> ApiResult<UpdatesResponse> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let batch = self.batch.lock().take();
            match batch {
                Some(batch) => Ok(batch),
                None => futures::future::pending().await,
            }
        }
    }

    fn stalling(batch: Option<UpdatesResponse>) -> (Bot, Arc<StallingClient>) {
        let client = Arc::new(StallingClient {
            batch: Mutex::new(batch),
            polls: AtomicUsize::new(0),
        });
        (Bot::with_client(client.clone()), client)
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drains_batch_in_flight() {
        let (bot, client) = stalling(Some(UpdatesResponse {
            updates: vec![message(1, "a"), message(2, "b")],
            marker: Some(7),
        }));

        let log: Log = Arc::default();
        let l = log.clone();
        bot.on_message(move |message: Message| {
            let l = l.clone();
            async move {
                let text = message.text().unwrap_or_default().to_string();
                l.lock().push(format!("{text}-begin"));
                tokio::time::sleep(Duration::from_secs(5)).await;
                l.lock().push(format!("{text}-end"));
            }
        });

        tokio_test::assert_ok!(
            bot.run_until(tokio::time::sleep(Duration::from_secs(1)))
                .await
        );

        assert_eq!(*log.lock(), vec!["a-begin", "a-end", "b-begin", "b-end"]);
        assert_eq!(bot.marker(), Some(7));
        assert_eq!(client.polls.load(Ordering::SeqCst), 1);
        assert!(!bot.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_pending_poll() {
        let (bot, client) = stalling(None);
        bot.set_marker(Some(3));

        let started = tokio::time::Instant::now();
        tokio_test::assert_ok!(
            bot.run_until(tokio::time::sleep(Duration::from_secs(1)))
                .await
        );

        assert_eq!(started.elapsed(), Duration::from_secs(1));
        assert_eq!(client.polls.load(Ordering::SeqCst), 1);
        assert_eq!(bot.marker(), Some(3));
        assert!(!bot.is_running());
    }
}
