//! # FMS Domain
//!
//! Domain types for the FMS dashboard API client.
//!
//! This crate contains:
//! - The domain error type and Result alias
//! - Configuration structures
//! - Endpoint, storage-key and event-name constants
//! - Payload types for the authentication protocol and the response envelope
//!
//! ## Architecture
//! - No dependencies on other FMS crates
//! - No I/O; transport and storage live in `fms-infra`

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
