// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::{header, Request, StatusCode};
use axum::body::Body;
use calling_portal::config::Config;
use calling_portal::middleware::auth::create_session_jwt;
use calling_portal::models::SessionUser;
use calling_portal::routes::create_router;
use calling_portal::services::{Credential, TokenManager, TokenStore, WebexClient, WebexService};
use calling_portal::AppState;
use chrono::{Duration, Utc};
use std::path::PathBuf;
use std::sync::Arc;

/// Unique token cache path per test so parallel tests never share state.
#[allow(dead_code)]
pub fn temp_token_path(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "calling-portal-test-{}-{}.toml",
        label,
        std::process::id()
    ))
}

/// Test config pointing every upstream endpoint at `base_url`.
#[allow(dead_code)]
pub fn test_config(base_url: &str, token_path: PathBuf) -> Config {
    let mut config = Config::test_default();
    config.api_base_url = base_url.to_string();
    config.auth_base_url = base_url.to_string();
    config.token_cache_path = token_path;
    config
}

/// The calling user all view tests log in as.
#[allow(dead_code)]
pub fn test_user() -> SessionUser {
    SessionUser {
        person_id: "person-1".to_string(),
        display_name: "Test User".to_string(),
        emails: vec!["user@example.com".to_string()],
        location_id: Some("loc-1".to_string()),
    }
}

/// Create a test app against a mock upstream, with a fresh service app
/// credential already cached so no token refresh is triggered.
#[allow(dead_code)]
pub fn create_test_app(base_url: &str, label: &str) -> (axum::Router, Arc<AppState>) {
    let token_path = temp_token_path(label);
    let _ = std::fs::remove_file(&token_path);

    let config = test_config(base_url, token_path.clone());

    let store = TokenStore::new(token_path);
    store
        .save(&Credential {
            access_token: "sa-access".to_string(),
            refresh_token: "sa-refresh".to_string(),
            expires_at: Utc::now() + Duration::days(30),
        })
        .expect("Failed to seed token cache");

    let token_manager = Arc::new(TokenManager::new(
        config.service_app_client_id.clone(),
        config.service_app_client_secret.clone(),
        config.service_app_refresh_token.clone(),
        format!("{}/access_token", config.auth_base_url),
        store,
    ));

    let client = WebexClient::new(
        config.api_base_url.clone(),
        std::time::Duration::from_secs(config.upstream_timeout_secs),
    );
    let webex = WebexService::new(client, token_manager);

    let state = Arc::new(AppState { config, webex });

    (create_router(state.clone()), state)
}

/// Session cookie header value for the test user.
#[allow(dead_code)]
pub fn session_cookie(state: &AppState) -> String {
    let jwt = create_session_jwt(&test_user(), &state.config.session_signing_key)
        .expect("Failed to create test session JWT");
    format!("portal_session={}", jwt)
}

/// GET request with the test session cookie.
#[allow(dead_code)]
pub fn authed_get(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

/// POST request with the test session cookie and a JSON body.
#[allow(dead_code)]
pub fn authed_post(uri: &str, cookie: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&bytes).expect("Response body was not valid JSON")
}

/// Assert a response is the portal's 401 JSON body.
#[allow(dead_code)]
pub async fn assert_unauthorized(response: axum::response::Response) {
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "unauthorized");
}
