//! Dashboard API client
//!
//! Bearer-authenticated pipeline with silent token refresh, the sibling
//! API-key transport and the account service built on top of them.
//!
//! # Architecture
//!
//! - `HttpClient` executes requests; it never retries or inspects statuses
//! - `AuthSession` owns the tokens, the refresh coordinator and the notifier
//! - `ApiClient` signs, classifies and hands expired requests to the session
//! - The refresh and its replays run on a spawned task, so cancelling one
//!   caller never strands the rest of the queue
//! - The refresh call goes straight to the transport, never through
//!   `ApiClient`

pub mod api_key;
pub mod auth;
pub mod client;
pub mod errors;
pub mod events;
pub mod refresh;
pub mod session;
pub mod tokens;

pub use api_key::ApiKeyClient;
pub use auth::AuthService;
pub use client::{ApiClient, ApiClientBuilder};
pub use errors::{ApiError, ApiErrorCategory};
pub use events::{EventBus, NoopSink, NotificationSink, TracingSink};
pub use refresh::{RefreshCoordinator, RefreshGuard, Replay, Settled, Ticket, Waiter};
pub use session::AuthSession;
pub use tokens::TokenStore;
