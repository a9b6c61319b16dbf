//! The update envelope and its type discriminant.
//!
//! An [`Update`] is a single inbound notification from the platform. The
//! [`UpdateType`] discriminant is decoded first and decides which optional
//! fields are meaningful; all other fields stay `None`.
//!
//! # Decoding
//!
//! ```rust,ignore
//! use maxbot_core::{Update, UpdateType};
//!
//! let update = Update::from_json(br#"{"update_type":"bot_started","timestamp":1}"#)?;
//! assert_eq!(update.update_type, UpdateType::BotStarted);
//! ```
//!
//! Decoding only fails when the envelope is not an object or its `timestamp`
//! is missing or not an integer. Unrecognised discriminants decode as
//! [`UpdateType::Unknown`] and keep their raw name in [`Update::type_name`].

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::warn;

use super::attachment::Attachment;
use super::callback::CallbackQuery;
use super::message::Message;
use super::user::User;
use super::{decode_nested, string_or_number};
use crate::error::{DecodeError, DecodeResult, json_kind};

// =============================================================================
// UpdateType
// =============================================================================

/// Discriminant of an [`Update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UpdateType {
    MessageCreated,
    MessageCallback,
    MessageEdited,
    MessageRemoved,
    BotAdded,
    BotRemoved,
    DialogMuted,
    DialogUnmuted,
    DialogCleared,
    DialogRemoved,
    UserAdded,
    UserRemoved,
    BotStarted,
    BotStopped,
    ChatTitleChanged,
    /// A discriminant this library does not recognise.
    ///
    /// Handlers registered for `Unknown` act as a catch-all for such updates;
    /// the raw name is available via [`Update::type_name`].
    Unknown,
}

impl UpdateType {
    /// Every discriminant the platform is known to send.
    pub const ALL: [UpdateType; 15] = [
        Self::MessageCreated,
        Self::MessageCallback,
        Self::MessageEdited,
        Self::MessageRemoved,
        Self::BotAdded,
        Self::BotRemoved,
        Self::DialogMuted,
        Self::DialogUnmuted,
        Self::DialogCleared,
        Self::DialogRemoved,
        Self::UserAdded,
        Self::UserRemoved,
        Self::BotStarted,
        Self::BotStopped,
        Self::ChatTitleChanged,
    ];

    /// Returns the wire name. [`UpdateType::Unknown`] has the name `"unknown"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessageCreated => "message_created",
            Self::MessageCallback => "message_callback",
            Self::MessageEdited => "message_edited",
            Self::MessageRemoved => "message_removed",
            Self::BotAdded => "bot_added",
            Self::BotRemoved => "bot_removed",
            Self::DialogMuted => "dialog_muted",
            Self::DialogUnmuted => "dialog_unmuted",
            Self::DialogCleared => "dialog_cleared",
            Self::DialogRemoved => "dialog_removed",
            Self::UserAdded => "user_added",
            Self::UserRemoved => "user_removed",
            Self::BotStarted => "bot_started",
            Self::BotStopped => "bot_stopped",
            Self::ChatTitleChanged => "chat_title_changed",
            Self::Unknown => "unknown",
        }
    }

    /// Looks up a discriminant by wire name, yielding [`UpdateType::Unknown`]
    /// for names this library does not recognise.
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .unwrap_or(Self::Unknown)
    }

    /// Returns false only for [`UpdateType::Unknown`].
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl FromStr for UpdateType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Update
// =============================================================================

/// A decoded inbound update.
///
/// Only the fields relevant to [`Update::update_type`] are populated. An
/// absent field means "not applicable", never "empty".
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub update_type: UpdateType,
    /// Event time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// The message, for `message_*` updates.
    pub message: Option<Message>,
    /// The pressed button, for `message_callback`.
    pub callback: Option<CallbackQuery>,
    /// The affected user, for membership and bot lifecycle updates.
    pub user: Option<User>,
    pub sender: Option<User>,
    pub user_locale: Option<String>,
    pub chat_id: Option<String>,
    /// Wire field `mid`, for `message_removed`.
    pub message_id: Option<String>,
    /// The new title, for `chat_title_changed`.
    pub title: Option<String>,
    type_name: String,
    raw: Value,
}

impl Update {
    /// Creates an update with only the discriminant and timestamp set.
    pub fn new(update_type: UpdateType, timestamp: i64) -> Self {
        Self {
            update_type,
            timestamp,
            message: None,
            callback: None,
            user: None,
            sender: None,
            user_locale: None,
            chat_id: None,
            message_id: None,
            title: None,
            type_name: update_type.as_str().to_string(),
            raw: Value::Null,
        }
    }

    /// Decodes an update from a parsed JSON value.
    pub fn from_value(value: Value) -> DecodeResult<Self> {
        let Some(obj) = value.as_object() else {
            return Err(DecodeError::NotAnObject {
                got: json_kind(&value),
            });
        };

        let type_name = obj
            .get("update_type")
            .and_then(string_or_number::render)
            .unwrap_or_default();
        let update_type = UpdateType::from_name(&type_name);
        if !update_type.is_known() {
            warn!(update_type = %type_name, "Unrecognized update type, decoding as unknown");
        }

        let timestamp = decode_timestamp(obj)?;

        Ok(Self {
            update_type,
            timestamp,
            message: decode_nested(obj, "message"),
            callback: decode_nested(obj, "callback"),
            user: decode_nested(obj, "user"),
            sender: decode_nested(obj, "sender"),
            user_locale: obj
                .get("user_locale")
                .and_then(|v| v.as_str())
                .map(String::from),
            chat_id: obj.get("chat_id").and_then(string_or_number::render),
            message_id: obj.get("mid").and_then(string_or_number::render),
            title: obj.get("title").and_then(|v| v.as_str()).map(String::from),
            type_name,
            raw: value,
        })
    }

    /// Parses and decodes an update from raw JSON bytes.
    pub fn from_json(bytes: &[u8]) -> DecodeResult<Self> {
        Self::from_value(serde_json::from_slice(bytes)?)
    }

    /// Decodes each entry of a batch in order, skipping the ones that fail.
    pub fn decode_batch(items: Vec<Value>) -> Vec<Update> {
        items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match Update::from_value(item) {
                Ok(update) => Some(update),
                Err(e) => {
                    warn!(index, error = %e, "Skipping undecodable update");
                    None
                }
            })
            .collect()
    }

    /// Returns the discriminant as it appeared on the wire.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the raw payload this update was decoded from.
    ///
    /// `Null` for updates built with [`Update::new`].
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Returns the message text, if the update carries a message with text.
    pub fn text(&self) -> Option<&str> {
        self.message.as_ref().and_then(Message::text)
    }

    /// Returns the message attachments, empty when there are none.
    pub fn attachments(&self) -> &[Attachment] {
        self.message
            .as_ref()
            .map(Message::attachments)
            .unwrap_or_default()
    }

    /// Returns the user this update is about.
    ///
    /// Prefers the affected user, then the callback's user, then the message
    /// sender.
    pub fn affected_user(&self) -> Option<&User> {
        self.user
            .as_ref()
            .or_else(|| self.callback.as_ref().and_then(|c| c.user.as_ref()))
            .or_else(|| self.message.as_ref().and_then(|m| m.sender.as_ref()))
            .or(self.sender.as_ref())
    }
}

fn decode_timestamp(obj: &Map<String, Value>) -> DecodeResult<i64> {
    match obj.get("timestamp") {
        None | Some(Value::Null) => Err(DecodeError::MissingField { field: "timestamp" }),
        Some(v) => v.as_i64().ok_or_else(|| {
            DecodeError::invalid_field("timestamp", format!("expected integer, got {}", json_kind(v)))
        }),
    }
}

impl<'de> Deserialize<'de> for Update {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// UpdatesResponse
// =============================================================================

/// One page of updates returned by a long-poll request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdatesResponse {
    /// Updates in the order the platform returned them.
    pub updates: Vec<Update>,
    /// Cursor for the next request; `None` leaves the current cursor in place.
    pub marker: Option<i64>,
}

impl UpdatesResponse {
    /// Decodes a response body.
    ///
    /// Entries that fail to decode are skipped with a warning so the cursor
    /// still advances past them.
    pub fn from_value(value: Value) -> DecodeResult<Self> {
        let Value::Object(mut obj) = value else {
            return Err(DecodeError::NotAnObject {
                got: json_kind(&value),
            });
        };

        let marker = match obj.get("marker") {
            None | Some(Value::Null) => None,
            Some(v) => Some(v.as_i64().ok_or_else(|| {
                DecodeError::invalid_field("marker", format!("expected integer, got {}", json_kind(v)))
            })?),
        };

        let updates = match obj.remove("updates") {
            Some(Value::Array(items)) => Update::decode_batch(items),
            None | Some(Value::Null) => Vec::new(),
            Some(other) => {
                return Err(DecodeError::invalid_field(
                    "updates",
                    format!("expected array, got {}", json_kind(&other)),
                ));
            }
        };

        Ok(Self { updates, marker })
    }
}

impl<'de> Deserialize<'de> for UpdatesResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_type_round_trip_names() {
        for t in UpdateType::ALL {
            assert_eq!(t.as_str().parse::<UpdateType>(), Ok(t));
        }
        assert_eq!("totally_unknown".parse::<UpdateType>(), Ok(UpdateType::Unknown));
    }

    #[test]
    fn test_decode_message_created() {
        let update = Update::from_value(json!({
            "update_type": "message_created",
            "timestamp": 111,
            "user_locale": "ru",
            "message": {
                "timestamp": 111,
                "recipient": {"chat_id": 1},
                "body": {"mid": "1", "seq": 1, "text": "Hi"}
            }
        }))
        .unwrap();

        assert_eq!(update.update_type, UpdateType::MessageCreated);
        assert_eq!(update.timestamp, 111);
        assert_eq!(update.text(), Some("Hi"));
        assert_eq!(update.user_locale.as_deref(), Some("ru"));
        assert!(update.callback.is_none());
        assert!(update.user.is_none());
    }

    #[test]
    fn test_unknown_type_does_not_fail() {
        let update =
            Update::from_value(json!({"update_type": "totally_unknown", "timestamp": 5})).unwrap();
        assert_eq!(update.update_type, UpdateType::Unknown);
        assert_eq!(update.type_name(), "totally_unknown");
        assert_eq!(update.raw()["timestamp"], 5);
    }

    #[test]
    fn test_missing_timestamp_fails() {
        let err = Update::from_value(json!({"update_type": "bot_started"})).unwrap_err();
        assert!(matches!(err, DecodeError::MissingField { field: "timestamp" }));

        let err =
            Update::from_value(json!({"update_type": "bot_started", "timestamp": "x"})).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidField { field: "timestamp", .. }));

        let err = Update::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, DecodeError::NotAnObject { got: "array" }));
    }

    #[test]
    fn test_malformed_callback_is_dropped() {
        let update = Update::from_value(json!({
            "update_type": "message_callback",
            "timestamp": 9,
            "callback": {"callback_id": "c1"},
            "user": {"user_id": 4}
        }))
        .unwrap();

        assert_eq!(update.timestamp, 9);
        assert!(update.callback.is_none());
        assert_eq!(update.user.as_ref().map(|u| u.user_id), Some(4));
    }

    #[test]
    fn test_numeric_ids_render_as_strings() {
        let update = Update::from_value(json!({
            "update_type": "message_removed",
            "timestamp": 1,
            "chat_id": 123456,
            "mid": "mid.abc"
        }))
        .unwrap();

        assert_eq!(update.chat_id.as_deref(), Some("123456"));
        assert_eq!(update.message_id.as_deref(), Some("mid.abc"));
    }

    #[test]
    fn test_affected_user_precedence() {
        let update = Update::from_value(json!({
            "update_type": "message_callback",
            "timestamp": 1,
            "callback": {"callback_id": "c", "payload": "p", "user": {"user_id": 2}}
        }))
        .unwrap();
        assert_eq!(update.affected_user().map(|u| u.user_id), Some(2));
    }

    #[test]
    fn test_updates_response_skips_bad_entries() {
        let resp = UpdatesResponse::from_value(json!({
            "updates": [
                {"update_type": "bot_started", "timestamp": 1},
                {"update_type": "bot_started"},
                {"update_type": "bot_stopped", "timestamp": 2}
            ],
            "marker": 77
        }))
        .unwrap();

        assert_eq!(resp.updates.len(), 2);
        assert_eq!(resp.updates[1].update_type, UpdateType::BotStopped);
        assert_eq!(resp.marker, Some(77));
    }

    #[test]
    fn test_updates_response_empty() {
        let resp = UpdatesResponse::from_value(json!({})).unwrap();
        assert!(resp.updates.is_empty());
        assert_eq!(resp.marker, None);

        let resp: UpdatesResponse =
            serde_json::from_str(r#"{"updates": [], "marker": null}"#).unwrap();
        assert_eq!(resp, UpdatesResponse::default());
    }
}
