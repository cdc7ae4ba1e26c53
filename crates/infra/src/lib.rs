//! # FMS Infrastructure
//!
//! I/O side of the FMS dashboard API client.
//!
//! This crate contains:
//! - The reqwest transport
//! - Credential storage backends (memory, JSON file, OS keyring)
//! - The authenticated pipeline with silent token refresh
//! - The API-key transport and the account service
//! - Configuration loading and tracing bootstrap
//!
//! ## Architecture
//! - Depends on `fms-domain` for data types and errors
//! - Contains all "impure" code (network, filesystem, keychain)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod storage;

// Re-export commonly used items
pub use api::{
    ApiClient, ApiError, ApiErrorCategory, ApiKeyClient, AuthService, AuthSession, EventBus,
    NoopSink, NotificationSink, TokenStore, TracingSink,
};
pub use errors::InfraError;
pub use http::{ApiRequest, HttpClient, HttpResponse, Transport};
pub use storage::{CredentialStore, FileStore, KeyringStore, MemoryStore};
