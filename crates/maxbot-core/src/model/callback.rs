use serde::Deserialize;

use super::message::Message;
use super::user::User;

/// A button press on an inline keyboard.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallbackQuery {
    pub callback_id: String,
    /// Opaque payload attached to the pressed button.
    pub payload: String,
    #[serde(default)]
    pub user: Option<User>,
    /// The message carrying the keyboard.
    #[serde(default)]
    pub message: Option<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_required() {
        let result: Result<CallbackQuery, _> =
            serde_json::from_value(json!({"callback_id": "c1"}));
        assert!(result.is_err());

        let cb: CallbackQuery = serde_json::from_value(json!({
            "callback_id": "c1",
            "payload": "buy_1",
            "user": {"user_id": 3}
        }))
        .unwrap();
        assert_eq!(cb.payload, "buy_1");
        assert_eq!(cb.user.map(|u| u.user_id), Some(3));
    }
}
