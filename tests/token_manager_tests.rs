// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token lifecycle tests against a mock identity provider.
//!
//! These verify the check-then-refresh contract: a credential with enough
//! lifetime left is served without network interaction, anything else
//! triggers exactly one refresh whose result is persisted.

use calling_portal::services::{Credential, TokenManager, TokenStore};
use chrono::{Duration, Utc};
use httpmock::prelude::*;
use std::sync::Arc;

mod common;

const FOURTEEN_DAYS_SECS: i64 = 14 * 24 * 60 * 60;

fn manager_for(server: &MockServer, store: TokenStore) -> TokenManager {
    TokenManager::new(
        "sa-client".to_string(),
        "sa-secret".to_string(),
        "seed-refresh".to_string(),
        server.url("/access_token"),
        store,
    )
}

fn credential_expiring_in(duration: Duration) -> Credential {
    Credential {
        access_token: "cached-access".to_string(),
        refresh_token: "cached-refresh".to_string(),
        expires_at: Utc::now() + duration,
    }
}

#[tokio::test]
async fn fresh_credential_is_served_without_refresh() {
    let server = MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/access_token");
            then.status(200).json_body(serde_json::json!({
                "access_token": "new-access",
                "refresh_token": "new-refresh",
                "expires_in": FOURTEEN_DAYS_SECS
            }));
        })
        .await;

    let store = TokenStore::new(common::temp_token_path("fresh"));
    store
        .save(&credential_expiring_in(Duration::hours(48)))
        .unwrap();

    let manager = manager_for(&server, store);
    let credential = manager.get_credential().await.unwrap();

    assert_eq!(credential.access_token, "cached-access");
    token_mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn expiring_credential_triggers_exactly_one_refresh() {
    let server = MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/access_token")
                .form_urlencoded_tuple("grant_type", "refresh_token")
                .form_urlencoded_tuple("refresh_token", "cached-refresh");
            then.status(200).json_body(serde_json::json!({
                "access_token": "new-access",
                "refresh_token": "new-refresh",
                "expires_in": FOURTEEN_DAYS_SECS
            }));
        })
        .await;

    let store = TokenStore::new(common::temp_token_path("expiring"));
    store
        .save(&credential_expiring_in(Duration::hours(1)))
        .unwrap();

    let manager = manager_for(&server, store);
    let credential = manager.get_credential().await.unwrap();

    token_mock.assert_calls_async(1).await;
    assert_eq!(credential.access_token, "new-access");
    assert!(credential.remaining() >= Duration::hours(24));
}

#[tokio::test]
async fn empty_store_refreshes_with_seed_and_persists() {
    let server = MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/access_token")
                .form_urlencoded_tuple("refresh_token", "seed-refresh");
            then.status(200).json_body(serde_json::json!({
                "access_token": "new-access",
                "refresh_token": "rotated-refresh",
                "expires_in": FOURTEEN_DAYS_SECS
            }));
        })
        .await;

    let path = common::temp_token_path("empty-store");
    let _ = std::fs::remove_file(&path);
    let store = TokenStore::new(path.clone());

    let manager = manager_for(&server, store);
    let credential = manager.get_credential().await.unwrap();

    token_mock.assert_calls_async(1).await;
    assert!(credential.remaining() >= Duration::hours(24));

    // The refreshed credential is now on disk.
    let persisted = TokenStore::new(path).load().unwrap();
    assert_eq!(persisted.access_token, "new-access");
    assert_eq!(persisted.refresh_token, "rotated-refresh");
}

#[tokio::test]
async fn provider_omitting_refresh_token_keeps_previous_one() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/access_token");
            then.status(200).json_body(serde_json::json!({
                "access_token": "new-access",
                "expires_in": FOURTEEN_DAYS_SECS
            }));
        })
        .await;

    let store = TokenStore::new(common::temp_token_path("no-rotation"));
    store
        .save(&credential_expiring_in(Duration::hours(1)))
        .unwrap();

    let manager = manager_for(&server, store);
    let credential = manager.get_credential().await.unwrap();

    assert_eq!(credential.refresh_token, "cached-refresh");
}

#[tokio::test]
async fn rejected_refresh_leaves_store_untouched() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/access_token");
            then.status(400).json_body(serde_json::json!({
                "error": "invalid_grant"
            }));
        })
        .await;

    let path = common::temp_token_path("rejected");
    let store = TokenStore::new(path.clone());
    let stale = credential_expiring_in(Duration::hours(1));
    store.save(&stale).unwrap();

    let manager = manager_for(&server, store);
    let err = manager.get_credential().await.unwrap_err();

    assert!(matches!(
        err,
        calling_portal::error::AppError::UpstreamAuth(_)
    ));

    // The persisted credential was not modified by the failed refresh.
    let persisted = TokenStore::new(path).load().unwrap();
    assert_eq!(persisted.access_token, stale.access_token);
    assert_eq!(persisted.refresh_token, stale.refresh_token);
}

#[tokio::test]
async fn concurrent_requests_share_one_refresh() {
    let server = MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/access_token");
            then.status(200).json_body(serde_json::json!({
                "access_token": "new-access",
                "refresh_token": "new-refresh",
                "expires_in": FOURTEEN_DAYS_SECS
            }));
        })
        .await;

    let store = TokenStore::new(common::temp_token_path("concurrent"));
    store
        .save(&credential_expiring_in(Duration::hours(1)))
        .unwrap();

    let manager = Arc::new(manager_for(&server, store));
    let (a, b) = tokio::join!(manager.get_credential(), manager.get_credential());

    // The refresh lock serializes the decision: the loser of the race finds
    // the winner's fresh credential and returns it without a second call.
    token_mock.assert_calls_async(1).await;
    assert_eq!(a.unwrap().access_token, "new-access");
    assert_eq!(b.unwrap().access_token, "new-access");
}
