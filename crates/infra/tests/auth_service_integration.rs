//! Integration tests for the account service
//!
//! Login, registration and logout against a mocked backend, with tokens
//! persisted to a real credentials file.

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use std::sync::Arc;

use fms_domain::{ChangePasswordRequest, LoginRequest, UpdateProfileRequest, UserRole};
use fms_infra::api::AuthService;
use fms_infra::storage::FileStore;
use serde_json::{json, Value};
use support::Harness;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user() -> Value {
    json!({
        "_id": "u1",
        "email": "ada@example.com",
        "name": "Ada",
        "role": "admin",
        "createdAt": "2024-03-01T10:00:00Z"
    })
}

#[tokio::test]
async fn login_persists_tokens_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let creds = dir.path().join("nested").join("creds.json");

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Login successful",
            "data": { "user": user(), "accessToken": "a1", "refreshToken": "r1", "expiresIn": 900 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::with_store(&server, Arc::new(FileStore::open(&creds).unwrap()));
    let service = AuthService::new(harness.client.clone());

    let credentials = LoginRequest { email: "ada@example.com".into(), password: "pw".into() };
    let response = service.login(&credentials).await.unwrap();

    let data = response.data.unwrap();
    assert!(data.user.is_admin());
    assert_eq!(data.user.role, Some(UserRole::Admin));
    assert_eq!(data.expires_in, Some(900));

    let restarted = Harness::with_store(&server, Arc::new(FileStore::open(&creds).unwrap()));
    assert_eq!(restarted.session.tokens().access_token().as_deref(), Some("a1"));
    assert_eq!(restarted.session.tokens().refresh_token().as_deref(), Some("r1"));
}

#[tokio::test]
async fn failed_login_stores_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid credentials" })))
        .mount(&server)
        .await;

    let harness = Harness::new(&server);
    let service = AuthService::new(harness.client.clone());

    let credentials = LoginRequest { email: "ada@example.com".into(), password: "nope".into() };
    assert!(service.login(&credentials).await.unwrap_err().is_unauthorized());
    assert!(!service.is_authenticated());
    assert_eq!(harness.sink.logouts(), 0);
}

#[tokio::test]
async fn logout_clears_tokens_and_emits_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(header("Authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": null })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server);
    harness.session.tokens().set_tokens("a1", "r1").unwrap();
    let service = AuthService::new(harness.client.clone());

    let response = service.logout().await.unwrap();

    assert!(response.is_success());
    assert!(!service.is_authenticated());
    assert_eq!(harness.session.tokens().refresh_token(), None);
    assert_eq!(harness.sink.logouts(), 0);
    server.verify().await;
}

#[tokio::test]
async fn profile_endpoints_use_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("Authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": user() })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/auth/me"))
        .and(body_json(json!({ "name": "Ada L." })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "_id": "u1", "email": "ada@example.com", "name": "Ada L." }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/change-password"))
        .and(body_json(json!({ "currentPassword": "old", "newPassword": "new" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": null })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server);
    harness.session.tokens().set_tokens("a1", "r1").unwrap();
    let service = AuthService::new(harness.client.clone());

    let me = service.current_user().await.unwrap().into_data().unwrap();
    assert_eq!(me.email, "ada@example.com");

    let update = UpdateProfileRequest { name: Some("Ada L.".into()) };
    let updated = service.update_current_user(&update).await.unwrap().into_data().unwrap();
    assert_eq!(updated.name, "Ada L.");

    let change =
        ChangePasswordRequest { current_password: "old".into(), new_password: "new".into() };
    assert!(service.change_password(&change).await.unwrap().is_success());
    server.verify().await;
}

#[tokio::test]
async fn expired_session_on_profile_refreshes_silently() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("Authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("Authorization", "Bearer a2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": user() })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": { "accessToken": "a2" } })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server);
    harness.session.tokens().set_tokens("a1", "r1").unwrap();
    let service = AuthService::new(harness.client.clone());

    let me = service.current_user().await.unwrap().into_data().unwrap();

    assert_eq!(me.id, "u1");
    assert_eq!(harness.session.tokens().access_token().as_deref(), Some("a2"));
    assert_eq!(harness.session.tokens().refresh_token().as_deref(), Some("r1"));
    server.verify().await;
}
