//! Messages and their components.

use serde::{Deserialize, Serialize};

use super::attachment::{
    Attachment, AttachmentKind, AttachmentPayload, ContactPayload, LocationPayload, PhotoPayload,
    StickerPayload,
};
use super::string_or_number;
use super::user::User;

/// A message as delivered by the platform.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Message {
    /// Creation time in milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub sender: Option<User>,
    #[serde(default)]
    pub recipient: Recipient,
    /// Message content. Older payloads name this field `message`.
    #[serde(default, alias = "message")]
    pub body: MessageBody,
    /// Forwarded or replied-to message.
    #[serde(default)]
    pub link: Option<LinkedMessage>,
    #[serde(default)]
    pub stat: Option<MessageStat>,
    /// Public URL, only present for channel posts.
    #[serde(default)]
    pub url: Option<String>,
}

impl Message {
    /// Returns the message text, if any.
    pub fn text(&self) -> Option<&str> {
        self.body.text.as_deref()
    }

    /// Returns the message ID.
    pub fn mid(&self) -> &str {
        &self.body.mid
    }

    /// Returns the attachments, empty when the message has none.
    pub fn attachments(&self) -> &[Attachment] {
        self.body.attachments.as_deref().unwrap_or_default()
    }

    /// Returns true if at least one attachment has the given kind.
    pub fn has_attachment(&self, kind: &AttachmentKind) -> bool {
        self.attachments().iter().any(|a| a.is(kind))
    }

    pub fn location(&self) -> Option<&LocationPayload> {
        self.attachments().iter().find_map(|a| match &a.payload {
            AttachmentPayload::Location(p) => Some(p),
            _ => None,
        })
    }

    pub fn contact(&self) -> Option<&ContactPayload> {
        self.attachments().iter().find_map(|a| match &a.payload {
            AttachmentPayload::Contact(p) => Some(p),
            _ => None,
        })
    }

    pub fn sticker(&self) -> Option<&StickerPayload> {
        self.attachments().iter().find_map(|a| match &a.payload {
            AttachmentPayload::Sticker(p) => Some(p),
            _ => None,
        })
    }

    /// Returns the first photo payload.
    pub fn photo(&self) -> Option<&PhotoPayload> {
        self.attachments().iter().find_map(|a| match &a.payload {
            AttachmentPayload::Photo(p) => Some(p),
            _ => None,
        })
    }

    /// Returns the chat this message was sent to.
    pub fn chat_id(&self) -> Option<i64> {
        self.recipient.chat_id
    }
}

/// Body of a message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageBody {
    #[serde(default, deserialize_with = "string_or_number::deserialize")]
    pub mid: String,
    #[serde(default)]
    pub seq: i64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default)]
    pub markup: Option<Vec<MarkupElement>>,
}

/// The chat or user a message was addressed to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    #[serde(default)]
    pub chat_id: Option<i64>,
    #[serde(default)]
    pub chat_type: Option<ChatType>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatType {
    Chat,
    Dialog,
    Channel,
    #[serde(other)]
    Unknown,
}

/// A forwarded or replied-to message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinkedMessage {
    #[serde(rename = "type")]
    pub link_type: LinkType,
    #[serde(default)]
    pub sender: Option<User>,
    #[serde(default)]
    pub chat_id: Option<i64>,
    #[serde(default)]
    pub message: Option<MessageBody>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Forward,
    Reply,
}

/// Message statistics, channels only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStat {
    #[serde(default)]
    pub views: i64,
}

/// A formatted span inside the message text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupElement {
    #[serde(rename = "type")]
    pub markup_type: MarkupType,
    pub from: i64,
    pub length: i64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkupType {
    Strong,
    Bold,
    Italic,
    Emphasized,
    Strikethrough,
    Underline,
    Monospaced,
    Code,
    Link,
    UserMention,
    Heading,
    Highlighted,
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_alias_and_numeric_mid() {
        let msg: Message = serde_json::from_value(json!({
            "timestamp": 1,
            "recipient": {"chat_id": 42, "chat_type": "dialog"},
            "message": {"mid": 100, "seq": 3, "text": "hi"}
        }))
        .unwrap();

        assert_eq!(msg.text(), Some("hi"));
        assert_eq!(msg.mid(), "100");
        assert_eq!(msg.chat_id(), Some(42));
        assert_eq!(msg.recipient.chat_type, Some(ChatType::Dialog));
    }

    #[test]
    fn test_attachment_helpers() {
        let msg: Message = serde_json::from_value(json!({
            "recipient": {},
            "body": {
                "mid": "m1",
                "attachments": [
                    {"type": "contact", "payload": {"name": "Bob", "vcf_phone": "+7"}},
                    {"type": "sticker", "payload": {"code": "abc"}}
                ]
            }
        }))
        .unwrap();

        assert!(msg.has_attachment(&AttachmentKind::Contact));
        assert!(!msg.has_attachment(&AttachmentKind::Image));
        assert_eq!(msg.contact().map(|c| c.name.as_str()), Some("Bob"));
        assert_eq!(msg.sticker().map(|s| s.code.as_str()), Some("abc"));
        assert!(msg.photo().is_none());
    }

    #[test]
    fn test_unknown_markup_and_chat_type() {
        let body: MessageBody = serde_json::from_value(json!({
            "mid": "m",
            "markup": [{"type": "blink", "from": 0, "length": 3}]
        }))
        .unwrap();
        let markup = body.markup.unwrap();
        assert_eq!(markup[0].markup_type, MarkupType::Unknown);

        let r: Recipient = serde_json::from_value(json!({"chat_type": "group"})).unwrap();
        assert_eq!(r.chat_type, Some(ChatType::Unknown));
    }
}
