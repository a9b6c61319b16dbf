//! Message attachments.
//!
//! The wire format tags each attachment with a `type` string and carries a
//! `payload` object whose shape depends on that tag. Payloads that do not
//! match their expected shape degrade to [`AttachmentPayload::Generic`] so the
//! attachment kind stays observable.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// The kind tag of an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    /// Wire tag `image` (also accepted as `photo`).
    Image,
    Video,
    Audio,
    File,
    Sticker,
    Contact,
    Location,
    Share,
    InlineKeyboard,
    /// Any tag this library does not model.
    Other(String),
}

impl AttachmentKind {
    /// Returns the canonical wire tag.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::File => "file",
            Self::Sticker => "sticker",
            Self::Contact => "contact",
            Self::Location => "location",
            Self::Share => "share",
            Self::InlineKeyboard => "inline_keyboard",
            Self::Other(tag) => tag,
        }
    }

    /// Parses a wire tag. Unknown tags become [`AttachmentKind::Other`].
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "image" | "photo" => Self::Image,
            "video" => Self::Video,
            "audio" => Self::Audio,
            "file" => Self::File,
            "sticker" => Self::Sticker,
            "contact" => Self::Contact,
            "location" => Self::Location,
            "share" => Self::Share,
            "inline_keyboard" => Self::InlineKeyboard,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for AttachmentKind {
    fn from(tag: &str) -> Self {
        Self::from_tag(tag)
    }
}

// =============================================================================
// Payloads
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoPayload {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub photo_id: Option<i64>,
}

/// Payload shared by video, audio and file attachments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPayload {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StickerPayload {
    pub code: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactPayload {
    pub name: String,
    #[serde(default)]
    pub contact_id: Option<i64>,
    #[serde(default)]
    pub vcf_info: Option<String>,
    #[serde(default)]
    pub vcf_phone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationPayload {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharePayload {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Typed attachment payload.
#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentPayload {
    Photo(PhotoPayload),
    Media(MediaPayload),
    Sticker(StickerPayload),
    Contact(ContactPayload),
    Location(LocationPayload),
    Share(SharePayload),
    /// Raw payload for untyped kinds or payloads that failed to decode.
    Generic(Value),
}

/// A single message attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub payload: AttachmentPayload,
}

impl Attachment {
    /// Builds an attachment from its raw JSON object.
    pub fn from_value(value: &Value) -> Self {
        let tag = value.get("type").and_then(|v| v.as_str()).unwrap_or("");
        let kind = AttachmentKind::from_tag(tag);

        let mut payload = value
            .get("payload")
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));

        // Location coordinates may sit on the attachment itself.
        if kind == AttachmentKind::Location && payload.as_object().is_some_and(|m| m.is_empty()) {
            payload = value.clone();
        }

        let typed = match kind {
            AttachmentKind::Image => typed_payload(&payload, AttachmentPayload::Photo),
            AttachmentKind::Video | AttachmentKind::Audio | AttachmentKind::File => {
                typed_payload(&payload, AttachmentPayload::Media)
            }
            AttachmentKind::Sticker => typed_payload(&payload, AttachmentPayload::Sticker),
            AttachmentKind::Contact => typed_payload(&payload, AttachmentPayload::Contact),
            AttachmentKind::Location => typed_payload(&payload, AttachmentPayload::Location),
            AttachmentKind::Share => typed_payload(&payload, AttachmentPayload::Share),
            AttachmentKind::InlineKeyboard | AttachmentKind::Other(_) => None,
        };

        let payload = typed.unwrap_or_else(|| {
            if !matches!(kind, AttachmentKind::InlineKeyboard | AttachmentKind::Other(_)) {
                warn!(kind = %kind, "Attachment payload did not match its kind, keeping raw payload");
            }
            AttachmentPayload::Generic(payload)
        });

        Self { kind, payload }
    }

    /// Returns true if this attachment has the given kind.
    pub fn is(&self, kind: &AttachmentKind) -> bool {
        &self.kind == kind
    }
}

fn typed_payload<T, F>(payload: &Value, wrap: F) -> Option<AttachmentPayload>
where
    T: for<'de> Deserialize<'de>,
    F: FnOnce(T) -> AttachmentPayload,
{
    serde_json::from_value(payload.clone()).ok().map(wrap)
}

impl<'de> Deserialize<'de> for Attachment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if !value.is_object() {
            return Err(serde::de::Error::custom("attachment must be an object"));
        }
        Ok(Self::from_value(&value))
    }
}
