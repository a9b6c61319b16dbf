//! Inbound data model.
//!
//! Every platform object is decoded leniently: optional fields default on
//! absence, and a malformed nested object only affects the field it lives in.
//! The [`Update`] envelope is the unit the rest of the framework works with.

mod attachment;
mod callback;
mod message;
mod update;
mod user;

pub use attachment::{
    Attachment, AttachmentKind, AttachmentPayload, ContactPayload, LocationPayload, MediaPayload,
    PhotoPayload, SharePayload, StickerPayload,
};
pub use callback::CallbackQuery;
pub use message::{
    ChatType, LinkType, LinkedMessage, MarkupElement, MarkupType, Message, MessageBody,
    MessageStat, Recipient,
};
pub use update::{Update, UpdateType, UpdatesResponse};
pub use user::{BotCommand, User};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Decodes an optional nested object, dropping it with a warning when malformed.
///
/// Absent and `null` values both yield `None`.
pub(crate) fn decode_nested<T: DeserializeOwned>(
    parent: &serde_json::Map<String, Value>,
    field: &'static str,
) -> Option<T> {
    let value = parent.get(field).filter(|v| !v.is_null())?;
    match serde_json::from_value(value.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(field, error = %e, "Dropping malformed nested object");
            None
        }
    }
}

/// Serde helpers for identifiers that arrive either as strings or numbers.
pub(crate) mod string_or_number {
    use serde::{Deserialize, Deserializer, de::Error};
    use serde_json::Value;

    /// Renders a JSON string or number as a `String`.
    pub fn render(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let value = Value::deserialize(deserializer)?;
        render(&value).ok_or_else(|| D::Error::custom("expected a string or a number"))
    }
}
