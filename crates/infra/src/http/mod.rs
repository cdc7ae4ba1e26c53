//! Base HTTP transport
//!
//! The undecorated request executor. Authentication, refresh and event
//! emission are layered on top by [`crate::api`].

pub mod client;
pub mod request;

pub use client::{HttpClient, HttpClientBuilder, Transport};
pub use request::{ApiRequest, HttpResponse};
