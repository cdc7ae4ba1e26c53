//! Authenticated session context
//!
//! One [`AuthSession`] per logical user session. It owns the token store and
//! the refresh coordinator and knows who to notify when the session ends.

use std::sync::Arc;

use fms_domain::constants::AUTH_REFRESH_PATH;
use fms_domain::{Envelope, TokenGrant};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, info_span, warn, Instrument};

use super::errors::ApiError;
use super::events::{NoopSink, NotificationSink};
use super::refresh::{RefreshCoordinator, Replay, Settled};
use super::tokens::TokenStore;
use crate::http::{ApiRequest, HttpResponse, Transport};
use crate::storage::{CredentialStore, MemoryStore};

pub struct AuthSession {
    tokens: TokenStore,
    refresh: RefreshCoordinator,
    notifier: Arc<dyn NotificationSink>,
}

impl AuthSession {
    pub fn new(store: Arc<dyn CredentialStore>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { tokens: TokenStore::new(store), refresh: RefreshCoordinator::new(), notifier }
    }

    /// Session backed by memory only, with notifications discarded.
    pub fn ephemeral() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(NoopSink))
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn notifier(&self) -> &dyn NotificationSink {
        self.notifier.as_ref()
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_in_flight()
    }

    /// End the session: forget every credential, then emit logout.
    pub fn expire(&self) {
        if let Err(err) = self.tokens.clear_tokens() {
            warn!(error = %err, "failed to clear stored tokens");
        }
        info!("session expired");
        self.notifier.on_logout();
    }

    /// Token to sign `request` with: its replay override, else the stored
    /// access token.
    pub fn bearer_for(&self, request: &ApiRequest) -> Option<String> {
        request.bearer_override.clone().or_else(|| self.tokens.access_token())
    }

    /// Attach `Authorization: Bearer` when a token is available and return
    /// the token used. Unsigned requests go out as they are.
    pub fn sign(&self, request: &mut ApiRequest) -> Option<String> {
        let token = self.bearer_for(request)?;
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(value) => {
                request.headers_mut().insert(AUTHORIZATION, value);
                Some(token)
            }
            Err(_) => {
                warn!("access token is not a valid header value; sending unsigned");
                None
            }
        }
    }

    /// Obtain a new access token, sharing any refresh already in flight.
    ///
    /// # Errors
    ///
    /// The refresh error, after the session has been expired.
    pub async fn refresh_access_token(
        self: &Arc<Self>,
        transport: &Arc<dyn Transport>,
    ) -> Result<String, ApiError> {
        Ok(self.await_refresh(transport, None).await?.token)
    }

    /// Queue `request` behind the shared refresh and return it as replayed
    /// with the new token.
    ///
    /// # Errors
    ///
    /// The refresh error, or the replay's transport error.
    pub async fn replay_after_refresh(
        self: &Arc<Self>,
        transport: &Arc<dyn Transport>,
        request: ApiRequest,
    ) -> Result<(ApiRequest, HttpResponse), ApiError> {
        let settled = self.await_refresh(transport, Some(request)).await?;
        let replay = settled.replay.ok_or(ApiError::RefreshAborted)?;
        Ok((replay.request, replay.result?))
    }

    async fn await_refresh(
        self: &Arc<Self>,
        transport: &Arc<dyn Transport>,
        request: Option<ApiRequest>,
    ) -> Result<Settled, ApiError> {
        let ticket = self.refresh.join(request);
        if ticket.is_leader() {
            self.spawn_refresh(Arc::clone(transport));
        }
        ticket.into_waiter().wait().await
    }

    /// Refresh and replay on a task detached from every caller.
    fn spawn_refresh(self: &Arc<Self>, transport: Arc<dyn Transport>) {
        let session = Arc::clone(self);
        let task = async move {
            let guard = session.refresh.guard();
            let outcome = session.lead_refresh(transport.as_ref()).await;
            guard
                .settle(outcome, |mut request| {
                    session.sign(&mut request);
                    let transport = Arc::clone(&transport);
                    async move {
                        let result = transport.execute(&request).await;
                        Replay { request, result }
                    }
                })
                .await;
        };
        tokio::spawn(task.instrument(info_span!("token_refresh")));
    }

    /// Only this path talks to the backend. On failure it clears the tokens
    /// and emits logout once; every caller gets the same error.
    async fn lead_refresh(&self, transport: &dyn Transport) -> Result<String, ApiError> {
        debug!("refreshing access token");
        match self.request_new_tokens(transport).await {
            Ok(access) => {
                info!("access token refreshed");
                Ok(access)
            }
            Err(err) => {
                warn!(error = %err, kind = err.label(), "token refresh failed");
                self.expire();
                Err(err)
            }
        }
    }

    async fn request_new_tokens(&self, transport: &dyn Transport) -> Result<String, ApiError> {
        let mut request = ApiRequest::post(AUTH_REFRESH_PATH).json(&json!({}))?;

        // Without a stored refresh token the backend falls back to its
        // HTTP-only cookie.
        if let Some(refresh) = self.tokens.refresh_token() {
            match HeaderValue::from_str(&format!("Bearer {refresh}")) {
                Ok(value) => {
                    request.headers_mut().insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("stored refresh token is not a valid header value"),
            }
        }

        let response = transport.execute(&request).await?;
        if !response.is_success() {
            let url = transport.url_for(request.path());
            return Err(ApiError::from_response(Method::POST, url, response));
        }

        // Wrapped `{ data }` bodies and the legacy `token` field are
        // compatibility shims; `{ accessToken, refreshToken? }` is canonical.
        let grant = response
            .json::<Envelope<TokenGrant>>()
            .map_err(|err| ApiError::InvalidRefreshResponse(err.to_string()))?
            .into_inner();

        let access = grant
            .access()
            .ok_or_else(|| ApiError::InvalidRefreshResponse("missing access token".into()))?
            .to_string();

        self.tokens.set_access_token(Some(&access))?;
        if let Some(refresh) = grant.refresh() {
            self.tokens.set_refresh_token(Some(refresh))?;
        }
        Ok(access)
    }
}
