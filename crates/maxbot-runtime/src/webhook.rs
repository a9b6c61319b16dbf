//! Webhook payload decoding.
//!
//! A pushed body is one of:
//!
//! - a single update object: `{"update_type": "...", ...}`
//! - a batch object: `{"updates": [{...}, {...}]}`
//! - a bare array of update objects
//!
//! Receiving the HTTP request is left to the embedding server; it hands the
//! body to [`Bot::handle_webhook`](crate::Bot::handle_webhook).

use serde_json::Value;
use tracing::debug;

use maxbot_core::{DecodeResult, Update};

/// Decodes a webhook body into the updates it carries, in order.
///
/// An empty or whitespace-only body yields no updates. Batch entries that
/// fail to decode are skipped with a warning; a single update object that
/// fails to decode is an error. JSON that is neither a batch nor an update
/// is ignored.
pub fn decode_payload(body: &[u8]) -> DecodeResult<Vec<Update>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let updates = match serde_json::from_slice::<Value>(body)? {
        Value::Array(items) => Update::decode_batch(items),
        Value::Object(mut obj) => match obj.remove("updates") {
            Some(Value::Array(items)) => Update::decode_batch(items),
            other => {
                if let Some(other) = other {
                    obj.insert("updates".to_string(), other);
                }
                if obj.contains_key("update_type") {
                    vec![Update::from_value(Value::Object(obj))?]
                } else {
                    debug!("Webhook body is neither an update nor a batch, ignoring");
                    Vec::new()
                }
            }
        },
        other => {
            debug!(kind = ?other, "Webhook body is not an object or array, ignoring");
            Vec::new()
        }
    };

    Ok(updates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use maxbot_core::{DecodeError, UpdateType};

    fn texts(updates: &[Update]) -> Vec<&str> {
        updates.iter().filter_map(Update::text).collect()
    }

    const FIRST: &str = r#"{"update_type":"message_created","timestamp":1,"message":{"body":{"mid":"a","text":"one"}}}"#;
    const SECOND: &str = r#"{"update_type":"message_created","timestamp":2,"message":{"body":{"mid":"b","text":"two"}}}"#;

    #[test]
    fn test_batch_object() {
        let body = format!(r#"{{"updates":[{FIRST},{SECOND}]}}"#);
        let updates = decode_payload(body.as_bytes()).unwrap();
        assert_eq!(texts(&updates), vec!["one", "two"]);
    }

    #[test]
    fn test_bare_array() {
        let body = format!("[{SECOND},{FIRST}]");
        let updates = decode_payload(body.as_bytes()).unwrap();
        assert_eq!(texts(&updates), vec!["two", "one"]);
    }

    #[test]
    fn test_single_object() {
        let updates = decode_payload(FIRST.as_bytes()).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].update_type, UpdateType::MessageCreated);
    }

    #[test]
    fn test_empty_body() {
        assert!(decode_payload(b"").unwrap().is_empty());
        assert!(decode_payload(b"  \n\t").unwrap().is_empty());
    }

    #[test]
    fn test_ignored_shapes() {
        assert!(decode_payload(br#"{"ok":true}"#).unwrap().is_empty());
        assert!(decode_payload(br#"{"updates":"nope"}"#).unwrap().is_empty());
        assert!(decode_payload(b"null").unwrap().is_empty());
        assert!(decode_payload(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_bad_batch_entry_skipped() {
        let body = format!(r#"[{FIRST},{{"update_type":"message_created"}},{SECOND}]"#);
        let updates = decode_payload(body.as_bytes()).unwrap();
        assert_eq!(texts(&updates), vec!["one", "two"]);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(decode_payload(b"{not json"), Err(DecodeError::Json(_))));
        assert!(matches!(
            decode_payload(br#"{"update_type":"bot_started"}"#),
            Err(DecodeError::MissingField { field: "timestamp" })
        ));
    }
}
