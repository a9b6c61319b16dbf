//! Filter predicates.
//!
//! Each filter wraps a handler and only forwards the call when its condition
//! holds. On non-match the wrapped handler is simply not called; the filter
//! returns `Ok(())` and the rest of the pipeline carries on.
//!
//! Matching filters hand extra data to the wrapped handler through a forked
//! context: [`CommandArgs`] for commands and [`Captures`] for regex matches.
//!
//! ```rust,ignore
//! registry.register(
//!     UpdateType::MessageCreated,
//!     filter::command("start", |args: CommandArgs| async move {
//!         info!(?args, "start");
//!     }),
//! );
//! ```

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use regex::{Regex, RegexBuilder};

use maxbot_core::{AttachmentKind, Update};

use crate::context::UpdateContext;
use crate::error::{HandlerResult, PatternError};
use crate::extractor::{Captures, CommandArgs};
use crate::handler::{BoxedHandler, Handler, into_handler};

// =============================================================================
// Commands
// =============================================================================

/// Normalizes a command name to a single leading `/`.
pub fn normalize_command(name: &str) -> String {
    format!("/{}", name.trim_start_matches('/'))
}

/// Matches `text` against a normalized command.
///
/// The first whitespace-delimited token is compared case-insensitively with
/// `command`. The remainder is split on single spaces into the arguments.
///
/// ```rust,ignore
/// let args = parse_command("/start", "/Start extra args").unwrap();
/// assert_eq!(&*args, ["extra", "args"]);
/// assert!(parse_command("/start", "/starter").is_none());
/// ```
pub fn parse_command(command: &str, text: &str) -> Option<CommandArgs> {
    let (head, rest) = match text.find(char::is_whitespace) {
        Some(pos) => (&text[..pos], text[pos..].trim_start()),
        None => (text, ""),
    };

    if head.to_lowercase() != command.to_lowercase() {
        return None;
    }

    let args = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(' ').map(String::from).collect()
    };
    Some(CommandArgs(args))
}

// =============================================================================
// Patterns
// =============================================================================

/// Compiles a regular expression.
///
/// Both bare patterns (`^hello`) and delimited patterns with trailing flags
/// (`/^hello$/i`) are accepted. Supported flags are `i`, `m`, `s`, `x` and
/// `u` (a no-op, matching is always Unicode-aware).
pub fn compile_pattern(pattern: &str) -> Result<Regex, PatternError> {
    let (body, flags) = split_delimited(pattern).unwrap_or((pattern, ""));

    let mut builder = RegexBuilder::new(body);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            'u' => builder.unicode(true),
            other => {
                return Err(PatternError::UnsupportedFlag {
                    pattern: pattern.to_string(),
                    flag: other,
                });
            }
        };
    }

    builder.build().map_err(|source| PatternError::Invalid {
        pattern: pattern.to_string(),
        source,
    })
}

/// Splits `/body/flags` into its body and flags.
fn split_delimited(pattern: &str) -> Option<(&str, &str)> {
    let rest = pattern.strip_prefix('/')?;
    let end = rest.rfind('/')?;
    let (body, flags) = (&rest[..end], &rest[end + 1..]);
    flags
        .chars()
        .all(|c| c.is_ascii_alphabetic())
        .then_some((body, flags))
}

/// How a callback payload is matched.
#[derive(Debug, Clone)]
pub enum CallbackPattern {
    /// Payload must equal the string.
    Exact(String),
    /// Payload must match the regex.
    Regex(Regex),
}

impl CallbackPattern {
    /// Parses a registration pattern.
    ///
    /// Patterns starting with `/` and longer than one character are regular
    /// expressions; anything else is an exact payload.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern.len() > 1 && pattern.starts_with('/') {
            compile_pattern(pattern).map(Self::Regex)
        } else {
            Ok(Self::Exact(pattern.to_string()))
        }
    }

    /// Returns true if `payload` matches.
    pub fn matches(&self, payload: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == payload,
            Self::Regex(regex) => regex.is_match(payload),
        }
    }
}

impl From<Regex> for CallbackPattern {
    fn from(regex: Regex) -> Self {
        Self::Regex(regex)
    }
}

// =============================================================================
// Handler wrappers
// =============================================================================

/// Wraps `handler` so it only runs when `select` yields a context for it.
fn guarded<S>(handler: BoxedHandler, select: S) -> BoxedHandler
where
    S: Fn(&Arc<UpdateContext>) -> Option<Arc<UpdateContext>> + Send + Sync + 'static,
{
    Arc::new(move |ctx: Arc<UpdateContext>| -> BoxFuture<'static, HandlerResult> {
        match select(&ctx) {
            Some(target) => handler(target),
            None => futures::future::ready(Ok(())).boxed(),
        }
    })
}

/// Runs `handler` only when `predicate` holds for the update.
pub fn when<P, H, T>(predicate: P, handler: H) -> BoxedHandler
where
    P: Fn(&Update) -> bool + Send + Sync + 'static,
    H: Handler<T>,
    T: 'static,
{
    guarded(into_handler(handler), move |ctx| {
        predicate(ctx.update()).then(|| Arc::clone(ctx))
    })
}

/// Runs `handler` when the message text is the given command.
///
/// The handler can extract the remaining words as [`CommandArgs`].
pub fn command<H, T>(name: &str, handler: H) -> BoxedHandler
where
    H: Handler<T>,
    T: 'static,
{
    let command = normalize_command(name);
    guarded(into_handler(handler), move |ctx| {
        let args = parse_command(&command, ctx.update().text()?)?;
        Some(Arc::new(ctx.fork_with(args)))
    })
}

/// Runs `handler` when the callback payload matches `pattern`.
///
/// For regex patterns the handler can extract the [`Captures`].
pub fn callback_query<H, T>(pattern: CallbackPattern, handler: H) -> BoxedHandler
where
    H: Handler<T>,
    T: 'static,
{
    guarded(into_handler(handler), move |ctx| {
        let payload = ctx.update().callback.as_ref()?.payload.as_str();
        match &pattern {
            CallbackPattern::Exact(expected) => {
                (expected == payload).then(|| Arc::clone(ctx))
            }
            CallbackPattern::Regex(regex) => {
                let captures = Captures::from_regex(regex, payload)?;
                Some(Arc::new(ctx.fork_with(captures)))
            }
        }
    })
}

/// Runs `handler` when the message text matches `regex`.
///
/// Updates without text never match. The handler can extract the [`Captures`].
pub fn text<H, T>(regex: Regex, handler: H) -> BoxedHandler
where
    H: Handler<T>,
    T: 'static,
{
    guarded(into_handler(handler), move |ctx| {
        let captures = Captures::from_regex(&regex, ctx.update().text()?)?;
        Some(Arc::new(ctx.fork_with(captures)))
    })
}

/// Runs `handler` when the message has at least one attachment of `kind`.
pub fn attachment<H, T>(kind: AttachmentKind, handler: H) -> BoxedHandler
where
    H: Handler<T>,
    T: 'static,
{
    when(
        move |update: &Update| update.attachments().iter().any(|a| a.is(&kind)),
        handler,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{callback_update, context_for, text_update};
    use maxbot_core::UpdateType;
    use parking_lot::Mutex;
    use serde_json::json;

    type Calls = Arc<Mutex<Vec<Vec<String>>>>;

    fn recorder(calls: &Calls) -> impl Fn(CommandArgs) -> BoxFuture<'static, ()> + Clone + Send + Sync + 'static {
        let calls = calls.clone();
        move |args: CommandArgs| {
            let calls = calls.clone();
            async move {
                calls.lock().push(args.into_inner());
            }
            .boxed()
        }
    }

    async fn run(handler: &BoxedHandler, update: Update) {
        handler(Arc::new(context_for(update))).await.unwrap();
    }

    #[test]
    fn test_normalize_command() {
        assert_eq!(normalize_command("start"), "/start");
        assert_eq!(normalize_command("/start"), "/start");
        assert_eq!(normalize_command("//start"), "/start");
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(
            parse_command("/start", "/Start extra args"),
            Some(CommandArgs(vec!["extra".into(), "args".into()]))
        );
        assert_eq!(parse_command("/start", "/start"), Some(CommandArgs::default()));
        assert_eq!(parse_command("/start", "/start   "), Some(CommandArgs::default()));
        assert_eq!(parse_command("/start", "/starter"), None);
        assert_eq!(parse_command("/start", "start"), None);
        assert_eq!(
            parse_command("/старт", "/СТАРТ a"),
            Some(CommandArgs(vec!["a".into()]))
        );
    }

    #[test]
    fn test_parse_command_naive_split() {
        assert_eq!(
            parse_command("/say", "/say \"a b\"  c"),
            Some(CommandArgs(vec![
                "\"a".into(),
                "b\"".into(),
                "".into(),
                "c".into()
            ]))
        );
    }

    #[test]
    fn test_compile_pattern() {
        let re = compile_pattern("/^hello$/i").unwrap();
        assert!(re.is_match("HELLO"));

        let re = compile_pattern("^hello").unwrap();
        assert!(re.is_match("hello world"));
        assert!(!re.is_match("HELLO"));

        assert!(matches!(
            compile_pattern("/a/q"),
            Err(PatternError::UnsupportedFlag { flag: 'q', .. })
        ));
        assert!(matches!(
            compile_pattern("(unclosed"),
            Err(PatternError::Invalid { .. })
        ));
    }

    #[test]
    fn test_callback_pattern() {
        let exact = CallbackPattern::parse("buy").unwrap();
        assert!(exact.matches("buy"));
        assert!(!exact.matches("buy_1"));

        let slash = CallbackPattern::parse("/").unwrap();
        assert!(matches!(slash, CallbackPattern::Exact(_)));

        let regex = CallbackPattern::parse(r"/^buy_\d+$/").unwrap();
        assert!(regex.matches("buy_12"));
        assert!(!regex.matches("sell_12"));
    }

    #[tokio::test]
    async fn test_command_filter() {
        let calls: Calls = Arc::default();
        let handler = command("start", recorder(&calls));

        run(&handler, text_update("/Start extra args")).await;
        run(&handler, text_update("hello")).await;
        run(&handler, text_update("/starter")).await;
        run(&handler, Update::new(UpdateType::MessageCreated, 1)).await;

        assert_eq!(*calls.lock(), vec![vec!["extra".to_string(), "args".to_string()]]);
    }

    #[tokio::test]
    async fn test_command_args_do_not_leak() {
        let ctx = Arc::new(context_for(text_update("/start now")));
        let handler = command("start", || async {});
        handler(Arc::clone(&ctx)).await.unwrap();
        assert!(!ctx.has_state::<CommandArgs>());
    }

    #[tokio::test]
    async fn test_callback_filter_captures() {
        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        let handler = callback_query(
            CallbackPattern::parse(r"/^buy_(\d+)$/").unwrap(),
            move |caps: Captures| {
                let s = s.clone();
                async move {
                    *s.lock() = caps.get(1).map(String::from);
                }
            },
        );

        run(&handler, callback_update("sell_1")).await;
        assert_eq!(*seen.lock(), None);
        run(&handler, callback_update("buy_7")).await;
        assert_eq!(seen.lock().as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn test_text_filter_requires_text() {
        let count = Arc::new(Mutex::new(0));
        let c = count.clone();
        let handler = text(compile_pattern("hel+o").unwrap(), move || {
            let c = c.clone();
            async move {
                *c.lock() += 1;
            }
        });

        run(&handler, text_update("well hello")).await;
        run(&handler, text_update("bye")).await;
        run(&handler, Update::new(UpdateType::MessageCreated, 1)).await;
        assert_eq!(*count.lock(), 1);
    }

    #[tokio::test]
    async fn test_attachment_filter() {
        let count = Arc::new(Mutex::new(0));
        let c = count.clone();
        let handler = attachment(AttachmentKind::Image, move || {
            let c = c.clone();
            async move {
                *c.lock() += 1;
            }
        });

        let photo = Update::from_value(json!({
            "update_type": "message_created",
            "timestamp": 1,
            "message": {
                "recipient": {"chat_id": 1},
                "body": {"mid": "m", "attachments": [{"type": "image", "payload": {"token": "t"}}]}
            }
        }))
        .unwrap();

        run(&handler, photo).await;
        run(&handler, text_update("no attachments")).await;
        assert_eq!(*count.lock(), 1);
    }
}
