//! reqwest implementation of [`PlatformClient`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Url};
use serde_json::Value;
use tracing::{debug, trace};

use maxbot_core::{
    ApiError, ApiMethod, ApiRequest, ApiResult, PlatformClient, TransportError, TransportResult,
    UpdatesRequest, UpdatesResponse,
};

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://platform-api.max.ru";

/// Timeout for ordinary requests. Long-poll requests add the poll timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builder for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpClientBuilder {
    token: String,
    base_url: String,
    timeout: Duration,
}

impl HttpClientBuilder {
    /// Overrides the API base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the client.
    pub fn build(self) -> TransportResult<HttpClient> {
        let raw = format!("{}/", self.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&raw).map_err(|e| TransportError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;

        let mut token = HeaderValue::from_str(&self.token)
            .map_err(|e| TransportError::Client(format!("invalid token: {e}")))?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, token);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(HttpClient {
            client,
            base_url,
            timeout: self.timeout,
        })
    }
}

/// HTTP client for the platform REST API.
///
/// Every request carries the bot token in the `Authorization` header. Cloning
/// is cheap and shares the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpClient {
    /// Starts building a client authenticated with `token`.
    pub fn builder(token: impl Into<String>) -> HttpClientBuilder {
        HttpClientBuilder {
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Creates a client for the production endpoint.
    pub fn new(token: impl Into<String>) -> TransportResult<Self> {
        Self::builder(token).build()
    }

    /// Returns the base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint<'a, I>(&self, path: &str, query: I) -> TransportResult<Url>
    where
        I: IntoIterator<Item = (&'a str, String)>,
    {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::InvalidUrl {
                url: path.to_string(),
                reason: e.to_string(),
            })?;

        let mut pairs = query.into_iter().peekable();
        if pairs.peek().is_some() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        timeout: Duration,
    ) -> ApiResult<Value> {
        debug!(method = %method, url = %url, "Sending API request");

        let mut request = self.client.request(method, url.clone()).timeout(timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_reqwest_error(&url, e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(&url, e))?;

        if !status.is_success() {
            debug!(status = status.as_u16(), url = %url, "API request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        trace!(url = %url, bytes = text.len(), "API response received");
        decode_body(&text)
    }
}

fn map_reqwest_error(url: &Url, e: reqwest::Error) -> ApiError {
    let url = url.to_string();
    let error = if e.is_timeout() {
        TransportError::Timeout { url }
    } else {
        TransportError::RequestFailed {
            url,
            reason: e.to_string(),
        }
    };
    error.into()
}

/// Parses a response body. An empty body is an empty object.
fn decode_body(text: &str) -> ApiResult<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    Ok(serde_json::from_str(text)?)
}

fn to_reqwest_method(method: ApiMethod) -> Method {
    match method {
        ApiMethod::Get => Method::GET,
        ApiMethod::Post => Method::POST,
        ApiMethod::Put => Method::PUT,
        ApiMethod::Patch => Method::PATCH,
        ApiMethod::Delete => Method::DELETE,
    }
}

fn updates_query(request: &UpdatesRequest) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("limit", request.limit.to_string()),
        ("timeout", request.timeout.to_string()),
    ];
    if let Some(marker) = request.marker {
        query.push(("marker", marker.to_string()));
    }
    if let Some(types) = request.types_param() {
        query.push(("types", types));
    }
    query
}

#[async_trait]
impl PlatformClient for HttpClient {
    async fn get_updates(&self, request: &UpdatesRequest) -> ApiResult<UpdatesResponse> {
        let url = self.endpoint("updates", updates_query(request))?;
        // The server holds the request for up to `request.timeout` seconds.
        let timeout = self.timeout + Duration::from_secs(u64::from(request.timeout));
        let value = self.send(Method::GET, url, None, timeout).await?;
        Ok(UpdatesResponse::from_value(value)?)
    }

    async fn call(&self, request: ApiRequest) -> ApiResult<Value> {
        let query = request.query.iter().map(|(k, v)| (k.as_str(), v.clone()));
        let url = self.endpoint(&request.path, query)?;
        self.send(
            to_reqwest_method(request.method),
            url,
            request.body.as_ref(),
            self.timeout,
        )
        .await
    }
}
