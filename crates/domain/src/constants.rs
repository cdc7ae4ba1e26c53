//! Client constants
//!
//! Endpoint paths, storage keys, header names and event names shared by the
//! transport and its consumers.

// Configuration defaults
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api/v1";
pub const DEFAULT_API_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_CREDENTIALS_FILE: &str = "fms_credentials.json";
pub const DEFAULT_KEYRING_SERVICE: &str = "fms-dashboard";

// Durable storage keys
pub const ACCESS_TOKEN_KEY: &str = "fms_access_token";
pub const REFRESH_TOKEN_KEY: &str = "fms_refresh_token";

// Auth endpoints (relative to the base URL)
pub const AUTH_REGISTER_PATH: &str = "/auth/register";
pub const AUTH_LOGIN_PATH: &str = "/auth/login";
pub const AUTH_LOGOUT_PATH: &str = "/auth/logout";
pub const AUTH_REFRESH_PATH: &str = "/auth/refresh";
pub const AUTH_ME_PATH: &str = "/auth/me";
pub const AUTH_CHANGE_PASSWORD_PATH: &str = "/auth/change-password";

/// A 401 on any of these means bad credentials, never an expired session.
pub const AUTH_BOOTSTRAP_PATHS: [&str; 3] = [AUTH_LOGIN_PATH, AUTH_REGISTER_PATH, AUTH_REFRESH_PATH];

// Headers
pub const API_KEY_HEADER: &str = "X-API-Key";

// Events
pub const EVENT_LOGOUT: &str = "auth:logout";
pub const EVENT_FORBIDDEN: &str = "auth:forbidden";
pub const EVENT_SERVER_ERROR: &str = "api:error";
pub const DEFAULT_SERVER_ERROR_MESSAGE: &str = "Server error. Please try again later.";

/// Whether `path` targets an endpoint exempt from the refresh path.
pub fn is_auth_bootstrap_path(path: &str) -> bool {
    AUTH_BOOTSTRAP_PATHS.iter().any(|exempt| path.contains(exempt))
}
