// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calling user portal API server.
//!
//! Authenticates users via Webex OIDC and lets them manage their own
//! calling configuration through the Webex REST API, using a shared
//! service-app credential for all upstream calls.

use calling_portal::{
    config::Config,
    services::{TokenManager, TokenStore, WebexClient, WebexService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting calling portal API");

    // Service app token lifecycle: on-disk cache + lazy refresh
    let store = TokenStore::new(config.token_cache_path.clone());
    let token_manager = Arc::new(TokenManager::new(
        config.service_app_client_id.clone(),
        config.service_app_client_secret.clone(),
        config.service_app_refresh_token.clone(),
        format!("{}/access_token", config.auth_base_url),
        store,
    ));
    tracing::info!(
        path = %config.token_cache_path.display(),
        "Token manager initialized"
    );

    // Webex REST API client
    let client = WebexClient::new(
        config.api_base_url.clone(),
        std::time::Duration::from_secs(config.upstream_timeout_secs),
    );
    let webex = WebexService::new(client, token_manager);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        webex,
    });

    // Build router
    let app = calling_portal::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("calling_portal=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
