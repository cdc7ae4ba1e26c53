//! Response envelope shared by most endpoints

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Standard `{ success, data, message, error, code }` envelope.
///
/// Every field is optional; backends are inconsistent about which ones they
/// populate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl<T> ApiResponse<T> {
    /// `true` unless the backend said `success: false` or set an error.
    pub fn is_success(&self) -> bool {
        self.success != Some(false) && self.error.as_deref().map_or(true, str::is_empty)
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

/// A payload that is either wrapped in `{ "data": ... }` or sent bare.
///
/// Compatibility shim: callers should not rely on which shape a backend uses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data,
        }
    }
}

/// Error body returned alongside non-2xx statuses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    /// Field-level validation messages
    #[serde(default)]
    pub errors: Option<HashMap<String, Vec<String>>>,
}

impl ErrorBody {
    /// Parse a raw body, yielding `None` for anything that is not a JSON object.
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }
}
