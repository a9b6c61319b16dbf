//! Helpers shared by the unit tests of this crate.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use maxbot_core::{ApiResult, PlatformClient, Update, UpdatesRequest, UpdatesResponse};

use crate::context::UpdateContext;
use crate::control::BotControl;

/// A client that never has updates.
pub struct NullClient;

#[async_trait]
impl PlatformClient for NullClient {
    async fn get_updates(&self, _request: &UpdatesRequest) -> ApiResult<UpdatesResponse> {
        Ok(UpdatesResponse::default())
    }
}

pub fn context_for(update: Update) -> UpdateContext {
    UpdateContext::new(update, Arc::new(NullClient), BotControl::new())
}

pub fn text_update(text: &str) -> Update {
    Update::from_value(json!({
        "update_type": "message_created",
        "timestamp": 1,
        "message": {
            "sender": {"user_id": 7, "first_name": "Ann"},
            "recipient": {"chat_id": 42, "chat_type": "dialog"},
            "body": {"mid": "mid.1", "text": text}
        }
    }))
    .unwrap()
}

pub fn callback_update(payload: &str) -> Update {
    Update::from_value(json!({
        "update_type": "message_callback",
        "timestamp": 2,
        "callback": {
            "callback_id": "cb.1",
            "payload": payload,
            "user": {"user_id": 7, "first_name": "Ann"}
        }
    }))
    .unwrap()
}
