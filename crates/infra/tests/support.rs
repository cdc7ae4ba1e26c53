use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fms_domain::{ApiConfig, ServerErrorEvent};
use fms_infra::api::{ApiClient, ApiKeyClient, AuthSession, NotificationSink};
use fms_infra::http::{HttpClient, Transport};
use fms_infra::storage::{CredentialStore, MemoryStore};
use parking_lot::Mutex;
use wiremock::MockServer;

/// Notification sink that records every call.
#[derive(Default)]
pub struct RecordingSink {
    logouts: AtomicUsize,
    forbidden: AtomicUsize,
    server_errors: Mutex<Vec<ServerErrorEvent>>,
}

impl RecordingSink {
    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    pub fn forbidden(&self) -> usize {
        self.forbidden.load(Ordering::SeqCst)
    }

    pub fn server_errors(&self) -> Vec<ServerErrorEvent> {
        self.server_errors.lock().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn on_logout(&self) {
        self.logouts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_forbidden(&self) {
        self.forbidden.fetch_add(1, Ordering::SeqCst);
    }

    fn on_server_error(&self, event: &ServerErrorEvent) {
        self.server_errors.lock().push(event.clone());
    }
}

/// Client, session and sink wired to one mock server.
pub struct Harness {
    pub client: ApiClient,
    pub session: Arc<AuthSession>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new(server: &MockServer) -> Self {
        Self::with_store(server, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(server: &MockServer, store: Arc<dyn CredentialStore>) -> Self {
        Self::with_transport(transport_for(server), store)
    }

    pub fn with_transport(transport: Arc<dyn Transport>, store: Arc<dyn CredentialStore>) -> Self {
        let sink = Arc::new(RecordingSink::default());
        let session = Arc::new(AuthSession::new(store, sink.clone()));
        let client = ApiClient::new(transport, session.clone());
        Self { client, session, sink }
    }

    pub fn api_key_client(&self, server: &MockServer) -> ApiKeyClient {
        ApiKeyClient::new(transport_for(server), self.session.clone())
    }
}

pub fn transport_for(server: &MockServer) -> Arc<HttpClient> {
    let config = ApiConfig { base_url: server.uri(), ..Default::default() };
    Arc::new(HttpClient::from_config(&config).expect("http client"))
}
