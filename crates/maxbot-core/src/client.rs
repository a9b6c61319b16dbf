//! The platform client seam.
//!
//! [`PlatformClient`] is what the engine consumes to fetch updates, and what
//! handlers use for one-shot actions. The HTTP implementation lives in
//! `maxbot-transport`; tests substitute scripted in-memory clients.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::model::{UpdateType, UpdatesResponse};

/// Default page size for update requests.
pub const DEFAULT_LIMIT: u32 = 100;
/// Default long-poll timeout in seconds.
pub const DEFAULT_POLL_TIMEOUT: u32 = 30;

/// Parameters of a long-poll request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatesRequest {
    /// Maximum number of updates to return.
    pub limit: u32,
    /// Seconds the server may hold the request open waiting for updates.
    pub timeout: u32,
    /// Resume after this cursor; `None` starts from the server's position.
    pub marker: Option<i64>,
    /// Only return these update types; `None` returns every type.
    pub types: Option<Vec<UpdateType>>,
}

impl Default for UpdatesRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            timeout: DEFAULT_POLL_TIMEOUT,
            marker: None,
            types: None,
        }
    }
}

impl UpdatesRequest {
    /// Renders the type filter as the comma separated list the API expects.
    pub fn types_param(&self) -> Option<String> {
        self.types.as_ref().map(|types| {
            types
                .iter()
                .map(UpdateType::as_str)
                .collect::<Vec<_>>()
                .join(",")
        })
    }
}

/// HTTP method of an [`ApiRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for ApiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        })
    }
}

/// A one-shot API call.
///
/// # Example
///
/// ```rust,ignore
/// let request = ApiRequest::post("messages")
///     .query("chat_id", chat_id)
///     .body(json!({ "text": "pong" }));
/// client.call(request).await?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: ApiMethod,
    /// Path relative to the API base URL, e.g. `messages`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: ApiMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(ApiMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(ApiMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(ApiMethod::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(ApiMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(ApiMethod::Delete, path)
    }

    /// Appends a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Sets the JSON body.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A connection to the platform API.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Fetches the next page of updates, waiting up to `request.timeout`
    /// seconds for new ones to arrive.
    async fn get_updates(&self, request: &UpdatesRequest) -> ApiResult<UpdatesResponse>;

    /// Performs a one-shot API call and returns the raw JSON response.
    async fn call(&self, request: ApiRequest) -> ApiResult<Value> {
        let _ = request;
        Err(ApiError::NotSupported)
    }
}
