//! Request and response values exchanged with a [`Transport`](super::Transport)

use fms_domain::FmsError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A request relative to the configured base URL.
///
/// Cloneable and fully buffered so it can be replayed after a token refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    headers: HeaderMap,
    /// One-shot marker: set once the refresh path has been taken
    pub(crate) retried: bool,
    /// Bearer token to use instead of the stored one (replays)
    pub(crate) bearer_override: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
            retried: false,
            bearer_override: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach a JSON body
    ///
    /// # Errors
    ///
    /// Returns `FmsError::InvalidInput` if the body cannot be serialized
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, FmsError> {
        let value = serde_json::to_value(body)
            .map_err(|e| FmsError::InvalidInput(format!("Failed to serialize body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Set an extra header, replacing any previous value
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub(crate) fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Whether this request has already been through the refresh path
    pub fn is_retried(&self) -> bool {
        self.retried
    }
}

/// A buffered HTTP response. Non-2xx statuses are data at this layer.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    body: String,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }

    /// Deserialize the body as JSON.
    ///
    /// 204/205 responses and empty bodies deserialize from `null`, so `()` and
    /// `Option<T>` targets succeed on them.
    ///
    /// # Errors
    ///
    /// Returns `FmsError::InvalidInput` if the body does not match `T`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FmsError> {
        let no_content = self.status == StatusCode::NO_CONTENT
            || self.status == StatusCode::RESET_CONTENT
            || self.body.trim().is_empty();

        if no_content {
            return serde_json::from_value(serde_json::Value::Null).map_err(|_| {
                FmsError::InvalidInput(format!(
                    "No content response ({}), but response type cannot be deserialized from empty body",
                    self.status.as_u16()
                ))
            });
        }

        serde_json::from_str(&self.body)
            .map_err(|e| FmsError::InvalidInput(format!("Failed to parse response: {e}")))
    }
}
