//! Mock backend helpers for integration tests.

#![allow(dead_code)]

use portal_auth::{ApiClient, DefaultHeaders, SessionStore};
use portal_storage::{MemoryStore, SessionVault};
use std::sync::Arc;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const LOGIN_ENVELOPE: &str =
    r#"{"refresh":"r1","access":"a1","user":{"id":7,"email":"ada@example.com","first_name":"Ada"}}"#;

/// API root served by `server`, as the client sees it.
pub fn api_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}/api/", server.uri())).unwrap()
}

/// JSON response, or a plain-text one when `body` is not JSON.
pub fn reply(status: u16, body: &str) -> ResponseTemplate {
    if serde_json::from_str::<serde_json::Value>(body).is_ok() {
        ResponseTemplate::new(status).set_body_raw(body, "application/json")
    } else {
        ResponseTemplate::new(status).set_body_string(body)
    }
}

/// Answer every `http_method /api/<endpoint>` with `status` and `body`.
pub async fn mount(server: &MockServer, http_method: &str, endpoint: &str, status: u16, body: &str) {
    Mock::given(method(http_method))
        .and(path(format!("/api/{endpoint}")))
        .respond_with(reply(status, body))
        .mount(server)
        .await;
}

/// Like [`mount`] but answers only the next matching request.
pub async fn mount_once(server: &MockServer, http_method: &str, endpoint: &str, status: u16, body: &str) {
    Mock::given(method(http_method))
        .and(path(format!("/api/{endpoint}")))
        .respond_with(reply(status, body))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

pub async fn received(server: &MockServer) -> Vec<Request> {
    server.received_requests().await.unwrap_or_default()
}

pub fn header(request: &Request, name: &str) -> Option<String> {
    request
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

pub fn body_text(request: &Request) -> String {
    String::from_utf8_lossy(&request.body).into_owned()
}

pub fn body_json(request: &Request) -> serde_json::Value {
    serde_json::from_slice(&request.body).unwrap()
}

/// Session over an in-memory store, plus an API client sharing its headers.
pub fn session_and_client(server: &MockServer) -> (SessionStore, ApiClient, Arc<MemoryStore>) {
    let storage = Arc::new(MemoryStore::new());
    let headers = DefaultHeaders::new();
    let session = SessionStore::new(SessionVault::new(storage.clone()), headers.clone());
    let api = ApiClient::new(api_url(server), Arc::new(headers));
    (session, api, storage)
}
