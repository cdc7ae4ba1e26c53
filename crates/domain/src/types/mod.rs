//! Domain types and models
//!
//! Only the payloads the authentication protocol depends on live here;
//! project, asset and billing payloads belong to their consumers.

pub mod auth;
pub mod events;
pub mod response;

pub use auth::{
    AuthData, ChangePasswordRequest, LoginRequest, RegisterRequest, TokenGrant,
    UpdateProfileRequest, User, UserRole,
};
pub use events::{AuthEvent, ServerErrorEvent};
pub use response::{ApiResponse, Envelope, ErrorBody};
