//! Authenticated API client
//!
//! Every request is signed with the session's bearer token. A 401 triggers a
//! single shared token refresh and the request is replayed once with the new
//! token; 403 and 500 responses are reported to the session's notifier.

use std::sync::Arc;

use fms_domain::constants::is_auth_bootstrap_path;
use fms_domain::{ApiConfig, ServerErrorEvent};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::errors::ApiError;
use super::session::AuthSession;
use crate::http::{ApiRequest, HttpClient, HttpResponse, Transport};

/// What to do with a response
enum Verdict {
    Done(HttpResponse),
    /// Expired session: refresh and replay
    Refresh(ApiError),
}

/// API client with bearer signing and silent token refresh
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    session: Arc<AuthSession>,
}

impl ApiClient {
    /// Wrap `transport` with the session's signing and refresh logic.
    ///
    /// The refresh call itself goes straight to `transport`, bypassing this
    /// pipeline.
    pub fn new(transport: Arc<dyn Transport>, session: Arc<AuthSession>) -> Self {
        Self { transport, session }
    }

    /// Build a reqwest-backed client from the `api` configuration section.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the HTTP client cannot be built
    pub fn from_config(config: &ApiConfig, session: Arc<AuthSession>) -> Result<Self, ApiError> {
        let transport = HttpClient::from_config(config)?;
        Ok(Self::new(Arc::new(transport), session))
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    /// The undecorated transport underneath this client
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Execute a request through the full pipeline and return the raw
    /// response.
    ///
    /// # Errors
    ///
    /// - `ApiError::Status` for any non-2xx response that could not be
    ///   recovered, including the replay's 401
    /// - Transport errors from either the request or the refresh call
    #[instrument(skip(self, request), fields(method = %request.method(), path = %request.path()))]
    pub async fn send(&self, request: ApiRequest) -> Result<HttpResponse, ApiError> {
        let mut request = request;
        let signed_with = self.session.sign(&mut request);
        let response = self.transport.execute(&request).await?;

        let unauthorized = match self.classify(&request, response)? {
            Verdict::Done(response) => return Ok(response),
            Verdict::Refresh(unauthorized) => unauthorized,
        };

        let (replayed, response) = self.recover(request, signed_with, unauthorized).await?;
        match self.classify(&replayed, response)? {
            Verdict::Done(response) => Ok(response),
            // Replays carry the retry marker, so a second 401 never lands here.
            Verdict::Refresh(unauthorized) => Err(unauthorized),
        }
    }

    /// Execute a request and deserialize its JSON body.
    ///
    /// 204/205 and empty bodies deserialize from `null`.
    ///
    /// # Errors
    ///
    /// As [`ApiClient::send`], plus `ApiError::Decode` if the body does not
    /// match `T`
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        Ok(response.json()?)
    }

    /// Execute a GET request
    #[instrument(skip(self), fields(path = %path))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(ApiRequest::get(path)).await
    }

    /// Execute a POST request with a JSON body
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send_json(ApiRequest::post(path).json(body)?).await
    }

    /// Execute a PUT request with a JSON body
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send_json(ApiRequest::put(path).json(body)?).await
    }

    /// Execute a PATCH request with a JSON body
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send_json(ApiRequest::patch(path).json(body)?).await
    }

    /// Execute a DELETE request
    #[instrument(skip(self), fields(path = %path))]
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(ApiRequest::delete(path)).await
    }

    fn classify(&self, request: &ApiRequest, response: HttpResponse) -> Result<Verdict, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(Verdict::Done(response));
        }

        let url = self.transport.url_for(request.path());
        debug!(%status, %url, retried = request.is_retried(), "request failed");

        match status {
            StatusCode::UNAUTHORIZED
                if !request.is_retried() && !is_auth_bootstrap_path(request.path()) =>
            {
                let err = ApiError::from_response(request.method().clone(), url, response);
                Ok(Verdict::Refresh(err))
            }
            StatusCode::FORBIDDEN => {
                self.session.notifier().on_forbidden();
                Err(ApiError::from_response(request.method().clone(), url, response))
            }
            StatusCode::INTERNAL_SERVER_ERROR => {
                let event = ServerErrorEvent::from_body(status.as_u16(), response.text());
                self.session.notifier().on_server_error(&event);
                Err(ApiError::from_response(request.method().clone(), url, response))
            }
            _ => Err(ApiError::from_response(request.method().clone(), url, response)),
        }
    }

    /// Replay `request` once after a 401, refreshing first unless another
    /// request already did.
    async fn recover(
        &self,
        mut request: ApiRequest,
        signed_with: Option<String>,
        unauthorized: ApiError,
    ) -> Result<(ApiRequest, HttpResponse), ApiError> {
        let Some(current) = self.session.tokens().access_token() else {
            info!("401 without a stored access token; ending session");
            self.session.expire();
            return Err(unauthorized);
        };

        request.retried = true;

        // The token was rotated while this request was on the wire.
        if signed_with.as_deref() != Some(current.as_str()) {
            debug!("replaying with the already refreshed token");
            request.bearer_override = Some(current);
            self.session.sign(&mut request);
            let response = self.transport.execute(&request).await?;
            return Ok((request, response));
        }

        self.session.replay_after_refresh(&self.transport, request).await
    }
}

/// Builder for [`ApiClient`]
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ApiConfig>,
    transport: Option<Arc<dyn Transport>>,
    session: Option<Arc<AuthSession>>,
}

impl ApiClientBuilder {
    /// Configuration for the default reqwest transport
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a custom transport instead of building one from the configuration
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn session(mut self, session: Arc<AuthSession>) -> Self {
        self.session = Some(session);
        self
    }

    /// Build the client. Without a session, an in-memory one with no
    /// notifications is used.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the default transport cannot be built
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpClient::from_config(&self.config.unwrap_or_default())?),
        };
        let session = self.session.unwrap_or_else(|| Arc::new(AuthSession::ephemeral()));
        Ok(ApiClient::new(transport, session))
    }
}
