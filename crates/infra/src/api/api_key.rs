//! API-key transport
//!
//! Used by upload and asset operations that authenticate with `X-API-Key`
//! instead of a bearer token. No refresh, no queuing, no notifications.

use std::sync::Arc;

use fms_domain::constants::API_KEY_HEADER;
use reqwest::header::{HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{instrument, warn};

use super::errors::ApiError;
use super::session::AuthSession;
use crate::http::{ApiRequest, Transport};

#[derive(Clone)]
pub struct ApiKeyClient {
    transport: Arc<dyn Transport>,
    session: Arc<AuthSession>,
}

impl ApiKeyClient {
    /// `session` supplies the stored key used when a call passes none.
    pub fn new(transport: Arc<dyn Transport>, session: Arc<AuthSession>) -> Self {
        Self { transport, session }
    }

    #[instrument(skip(self, api_key), fields(path = %path))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        api_key: Option<&str>,
    ) -> Result<T, ApiError> {
        self.execute(ApiRequest::get(path), api_key).await
    }

    #[instrument(skip(self, body, api_key), fields(path = %path))]
    pub async fn post<B, T>(&self, path: &str, body: &B, api_key: Option<&str>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.execute(ApiRequest::post(path).json(body)?, api_key).await
    }

    #[instrument(skip(self, body, api_key), fields(path = %path))]
    pub async fn patch<B, T>(&self, path: &str, body: &B, api_key: Option<&str>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.execute(ApiRequest::patch(path).json(body)?, api_key).await
    }

    #[instrument(skip(self, api_key), fields(path = %path))]
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        api_key: Option<&str>,
    ) -> Result<T, ApiError> {
        self.execute(ApiRequest::delete(path), api_key).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        mut request: ApiRequest,
        api_key: Option<&str>,
    ) -> Result<T, ApiError> {
        // A per-call key takes precedence over the stored one.
        let key = api_key
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .or_else(|| self.session.tokens().api_key());
        if let Some(key) = key {
            match HeaderValue::from_str(&key) {
                Ok(value) => {
                    request.headers_mut().insert(HeaderName::from_static("x-api-key"), value);
                }
                Err(_) => warn!(header = API_KEY_HEADER, "API key is not a valid header value"),
            }
        }

        let response = self.transport.execute(&request).await?;
        if !response.is_success() {
            let url = self.transport.url_for(request.path());
            return Err(ApiError::from_response(request.method().clone(), url, response));
        }
        Ok(response.json()?)
    }
}
