//! Account endpoints
//!
//! Login and registration are the only places besides the refresh path that
//! store tokens; logout is the only place besides session expiry that clears
//! them.

use fms_domain::constants::{
    AUTH_CHANGE_PASSWORD_PATH, AUTH_LOGIN_PATH, AUTH_LOGOUT_PATH, AUTH_ME_PATH, AUTH_REGISTER_PATH,
};
use fms_domain::{
    ApiResponse, AuthData, ChangePasswordRequest, LoginRequest, RegisterRequest,
    UpdateProfileRequest, User,
};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::client::ApiClient;
use super::errors::ApiError;
use crate::http::ApiRequest;

/// Account service on top of the authenticated client
#[derive(Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Log in and store the issued tokens.
    ///
    /// # Errors
    ///
    /// Returns the backend's 401 for bad credentials (never refreshed), or
    /// `ApiError::Storage` if the tokens cannot be persisted
    #[instrument(skip(self, credentials))]
    pub async fn login(&self, credentials: &LoginRequest) -> Result<ApiResponse<AuthData>, ApiError> {
        let response: ApiResponse<AuthData> = self.client.post(AUTH_LOGIN_PATH, credentials).await?;
        self.store_grant(&response)?;
        info!("logged in");
        Ok(response)
    }

    /// Create an account and store the issued tokens.
    ///
    /// # Errors
    ///
    /// As [`AuthService::login`]
    #[instrument(skip(self, registration))]
    pub async fn register(
        &self,
        registration: &RegisterRequest,
    ) -> Result<ApiResponse<AuthData>, ApiError> {
        let response: ApiResponse<AuthData> =
            self.client.post(AUTH_REGISTER_PATH, registration).await?;
        self.store_grant(&response)?;
        info!("registered");
        Ok(response)
    }

    /// End the session on the backend, then forget the local tokens even if
    /// the call failed.
    ///
    /// # Errors
    ///
    /// Returns the logout call's error; local tokens are cleared regardless
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<ApiResponse<Value>, ApiError> {
        let result = self.client.send_json(ApiRequest::post(AUTH_LOGOUT_PATH)).await;
        if let Err(err) = self.client.session().tokens().clear_tokens() {
            warn!(error = %err, "failed to clear stored tokens on logout");
        }
        info!(success = result.is_ok(), "logged out");
        result
    }

    pub async fn current_user(&self) -> Result<ApiResponse<User>, ApiError> {
        self.client.get(AUTH_ME_PATH).await
    }

    pub async fn update_current_user(
        &self,
        update: &UpdateProfileRequest,
    ) -> Result<ApiResponse<User>, ApiError> {
        self.client.patch(AUTH_ME_PATH, update).await
    }

    #[instrument(skip(self, request))]
    pub async fn change_password(
        &self,
        request: &ChangePasswordRequest,
    ) -> Result<ApiResponse<Value>, ApiError> {
        self.client.post(AUTH_CHANGE_PASSWORD_PATH, request).await
    }

    /// Whether an access token is available
    pub fn is_authenticated(&self) -> bool {
        self.client.session().tokens().has_tokens()
    }

    fn store_grant(&self, response: &ApiResponse<AuthData>) -> Result<(), ApiError> {
        let Some(access) = response.data.as_ref().and_then(|data| data.grant.access()) else {
            debug!("auth response carried no access token");
            return Ok(());
        };
        // Without a refresh token the access token doubles as one.
        let refresh = response.data.as_ref().and_then(|data| data.grant.refresh()).unwrap_or(access);
        self.client.session().tokens().set_tokens(access, refresh)?;
        Ok(())
    }
}
