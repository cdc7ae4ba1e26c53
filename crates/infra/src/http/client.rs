use std::time::Duration;

use async_trait::async_trait;
use fms_domain::{ApiConfig, FmsError};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client as ReqwestClient;
use tracing::debug;

use super::request::{ApiRequest, HttpResponse};
use crate::api::ApiError;
use crate::errors::InfraError;

/// Executes a single request and buffers the response.
///
/// Implementations never retry and never inspect the status code; that is
/// the job of the decorating pipeline.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &ApiRequest) -> Result<HttpResponse, ApiError>;

    /// Absolute URL for `path`, used in error messages
    fn url_for(&self, path: &str) -> String {
        path.to_string()
    }
}

/// reqwest-backed transport bound to a base URL, with one fixed timeout.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Build a client from the `api` section of the configuration.
    pub fn from_config(config: &ApiConfig) -> Result<Self, FmsError> {
        Self::builder()
            .base_url(&config.base_url)
            .timeout(Duration::from_millis(config.timeout_ms))
            .cookie_store(config.with_credentials)
            .build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Absolute URL for a request path.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn map_transport_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            return ApiError::Timeout(self.timeout);
        }
        let infra: InfraError = err.into();
        ApiError::from(FmsError::from(infra))
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn execute(&self, request: &ApiRequest) -> Result<HttpResponse, ApiError> {
        let url = self.url_for(request.path());
        let method = request.method().clone();

        let mut builder = self.client.request(method.clone(), &url).headers(request.headers().clone());
        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        debug!(%method, %url, "sending HTTP request");

        let response = builder.send().await.map_err(|err| {
            debug!(%method, %url, error = %err, "HTTP request failed");
            self.map_transport_error(err)
        })?;

        let status = response.status();
        debug!(%method, %url, %status, "received HTTP response");

        let body = response.text().await.map_err(|err| self.map_transport_error(err))?;
        Ok(HttpResponse::new(status, body))
    }

    fn url_for(&self, path: &str) -> String {
        HttpClient::url_for(self, path)
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    base_url: String,
    timeout: Duration,
    cookie_store: bool,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        let defaults = ApiConfig::default();
        Self {
            base_url: defaults.base_url,
            timeout: Duration::from_millis(defaults.timeout_ms),
            cookie_store: defaults.with_credentials,
            user_agent: None,
            default_headers: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Keep cookies between requests (`withCredentials` in browser terms).
    pub fn cookie_store(mut self, enabled: bool) -> Self {
        self.cookie_store = enabled;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<HttpClient, FmsError> {
        if self.base_url.is_empty() {
            return Err(FmsError::Config("API base URL must not be empty".into()));
        }

        let mut headers = self.default_headers.unwrap_or_default();
        headers
            .entry(CONTENT_TYPE)
            .or_insert_with(|| HeaderValue::from_static("application/json"));

        let mut builder = ReqwestClient::builder()
            .timeout(self.timeout)
            .cookie_store(self.cookie_store)
            .default_headers(headers)
            .no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(|err| {
            let infra: InfraError = err.into();
            FmsError::Config(FmsError::from(infra).to_string())
        })?;

        Ok(HttpClient { client, base_url: self.base_url, timeout: self.timeout })
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use reqwest::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> HttpClient {
        HttpClient::builder().base_url(&server.uri()).build().expect("http client")
    }

    #[tokio::test]
    async fn returns_non_success_status_as_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server).execute(&ApiRequest::get("/missing")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.text(), "nope");
    }

    #[tokio::test]
    async fn does_not_retry_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server).execute(&ApiRequest::get("/flaky")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
    }

    #[tokio::test]
    async fn sends_query_body_and_json_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/projects"))
            .and(query_param("dryRun", "true"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(json!({ "name": "photos" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "p1" })))
            .expect(1)
            .mount(&server)
            .await;

        let request = ApiRequest::post("/projects")
            .query("dryRun", "true")
            .json(&json!({ "name": "photos" }))
            .unwrap();
        let response = client_for(&server).execute(&request).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.json::<serde_json::Value>().unwrap(), json!({ "id": "p1" }));
    }

    #[tokio::test]
    async fn slow_response_maps_to_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client = HttpClient::builder()
            .base_url(&server.uri())
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();

        let result = client.execute(&ApiRequest::get("/slow")).await;
        assert!(matches!(result, Err(ApiError::Timeout(t)) if t == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn refused_connection_maps_to_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // release the port so that requests fail with ECONNREFUSED

        let client = HttpClient::builder().base_url(&format!("http://{addr}")).build().unwrap();

        match client.execute(&ApiRequest::get("/")).await {
            Err(ApiError::Network(msg)) => assert!(msg.to_lowercase().contains("http")),
            other => panic!("expected network error, got {:?}", other),
        }
    }

    #[test]
    fn url_for_joins_paths_with_single_slash() {
        let client =
            HttpClient::builder().base_url("https://files.example.com/api/v1/").build().unwrap();
        assert_eq!(client.url_for("/projects"), "https://files.example.com/api/v1/projects");
        assert_eq!(client.url_for("assets"), "https://files.example.com/api/v1/assets");
    }

    #[test]
    fn empty_base_url_is_rejected() {
        assert!(matches!(HttpClient::builder().base_url("").build(), Err(FmsError::Config(_))));
    }
}
