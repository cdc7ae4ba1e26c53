//! API-specific error types
//!
//! `ApiError` keeps the transport's answer intact (status and body) so callers
//! can branch on status codes; the pipeline only adds side effects.

use std::time::Duration;

use fms_domain::{ErrorBody, FmsError};
use reqwest::{Method, StatusCode};
use thiserror::Error;

use crate::http::HttpResponse;

/// Categories of API errors, used for logging and caller-side branching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// 401 - session expired or credentials rejected
    Unauthorized,
    /// 403 - authenticated but not allowed
    Forbidden,
    /// 429
    RateLimit,
    /// 5xx
    Server,
    /// Other 4xx
    Client,
    /// Connection failures and timeouts
    Network,
    /// The refresh protocol itself failed without an HTTP status
    Refresh,
    /// Local failures: decoding, storage, configuration
    Local,
}

/// API operation errors
///
/// `Clone` so a single refresh failure can be delivered to every queued
/// request.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("{method} {url} returned status {status}{}", body_suffix(.body))]
    Status { method: Method, url: String, status: StatusCode, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Invalid refresh response: {0}")]
    InvalidRefreshResponse(String),

    #[error("Token refresh was abandoned before it completed")]
    RefreshAborted,

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

impl ApiError {
    /// Wrap a non-2xx response, keeping its body verbatim
    pub fn from_response(method: Method, url: String, response: HttpResponse) -> Self {
        let status = response.status();
        Self::Status { method, url, status, body: response.into_body() }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Status { status, .. } => match *status {
                StatusCode::UNAUTHORIZED => ApiErrorCategory::Unauthorized,
                StatusCode::FORBIDDEN => ApiErrorCategory::Forbidden,
                StatusCode::TOO_MANY_REQUESTS => ApiErrorCategory::RateLimit,
                s if s.is_server_error() => ApiErrorCategory::Server,
                _ => ApiErrorCategory::Client,
            },
            Self::Network(_) | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::InvalidRefreshResponse(_) | Self::RefreshAborted => ApiErrorCategory::Refresh,
            Self::Decode(_) | Self::Storage(_) | Self::Config(_) | Self::Internal(_) => {
                ApiErrorCategory::Local
            }
        }
    }

    /// HTTP status, when the error came from a response
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body, when the error came from a response
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Parsed `{ message, code, errors }` body, if the backend sent JSON
    pub fn error_body(&self) -> Option<ErrorBody> {
        self.body().and_then(ErrorBody::parse)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Stable label for structured logs
    pub fn label(&self) -> &'static str {
        match self.category() {
            ApiErrorCategory::Unauthorized => "unauthorized",
            ApiErrorCategory::Forbidden => "forbidden",
            ApiErrorCategory::RateLimit => "rate_limit",
            ApiErrorCategory::Server => "server",
            ApiErrorCategory::Client => "client",
            ApiErrorCategory::Network => "network",
            ApiErrorCategory::Refresh => "refresh",
            ApiErrorCategory::Local => "local",
        }
    }
}

impl From<FmsError> for ApiError {
    fn from(err: FmsError) -> Self {
        match err {
            FmsError::Network(message) => Self::Network(message),
            FmsError::Config(message) => Self::Config(message),
            FmsError::Storage(message) | FmsError::NotFound(message) => Self::Storage(message),
            FmsError::InvalidInput(message) => Self::Decode(message),
            FmsError::Auth(message) | FmsError::Internal(message) => Self::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(code: u16, body: &str) -> ApiError {
        ApiError::Status {
            method: Method::GET,
            url: "http://localhost/api/v1/projects".into(),
            status: StatusCode::from_u16(code).unwrap(),
            body: body.into(),
        }
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(status_error(401, "").category(), ApiErrorCategory::Unauthorized);
        assert_eq!(status_error(403, "").category(), ApiErrorCategory::Forbidden);
        assert_eq!(status_error(429, "").category(), ApiErrorCategory::RateLimit);
        assert_eq!(status_error(502, "").category(), ApiErrorCategory::Server);
        assert_eq!(status_error(404, "").category(), ApiErrorCategory::Client);
        assert_eq!(ApiError::Timeout(Duration::from_secs(1)).category(), ApiErrorCategory::Network);
        assert_eq!(ApiError::RefreshAborted.category(), ApiErrorCategory::Refresh);
        assert_eq!(ApiError::Storage("x".into()).category(), ApiErrorCategory::Local);
    }

    #[test]
    fn status_error_keeps_body_verbatim() {
        let err = status_error(500, r#"{"message":"boom"}"#);
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(err.body(), Some(r#"{"message":"boom"}"#));
        assert_eq!(err.error_body().and_then(|b| b.message).as_deref(), Some("boom"));
        assert!(err.to_string().ends_with(r#"returned status 500 Internal Server Error: {"message":"boom"}"#));
    }

    #[test]
    fn empty_body_is_omitted_from_message() {
        let err = status_error(404, "");
        assert!(err.to_string().ends_with("returned status 404 Not Found"));
    }

    #[test]
    fn domain_errors_convert_by_kind() {
        assert!(matches!(ApiError::from(FmsError::Network("x".into())), ApiError::Network(_)));
        assert!(matches!(ApiError::from(FmsError::Storage("x".into())), ApiError::Storage(_)));
        assert!(matches!(ApiError::from(FmsError::Config("x".into())), ApiError::Config(_)));
    }

    #[test]
    fn local_failures_are_not_labelled_network() {
        for err in [FmsError::Auth("no session".into()), FmsError::Internal("bug".into())] {
            let mapped = ApiError::from(err);
            assert!(matches!(mapped, ApiError::Internal(_)));
            assert_eq!(mapped.label(), "local");
        }
    }
}
