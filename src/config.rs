// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Two credential pairs are involved: the OIDC integration used for user
//! login, and the service app whose refresh token mints the access tokens
//! for all Webex REST calls.

use std::env;
use std::path::PathBuf;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- OIDC integration (user login) ---
    /// OIDC client ID (public)
    pub oidc_client_id: String,
    /// OIDC client secret
    pub oidc_client_secret: String,
    /// Redirect URL registered for the OIDC integration
    pub redirect_url: String,

    // --- Service app (Webex REST calls) ---
    /// Service app client ID
    pub service_app_client_id: String,
    /// Service app client secret
    pub service_app_client_secret: String,
    /// Long-lived service app refresh token
    pub service_app_refresh_token: String,

    // --- Endpoints ---
    /// Webex REST API base URL
    pub api_base_url: String,
    /// Webex authorization/token endpoint base URL
    pub auth_base_url: String,

    // --- Portal ---
    /// Frontend URL for post-login redirects
    pub frontend_url: String,
    /// Session JWT and OAuth state signing key (raw bytes)
    pub session_signing_key: Vec<u8>,
    /// Path of the on-disk token cache
    pub token_cache_path: PathBuf,
    /// Per-call timeout for upstream requests, in seconds
    pub upstream_timeout_secs: u64,
    /// Server port
    pub port: u16,
}

const DEFAULT_API_BASE: &str = "https://webexapis.com/v1";

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            oidc_client_id: env::var("OIDC_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("OIDC_CLIENT_ID"))?,
            oidc_client_secret: env::var("OIDC_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("OIDC_CLIENT_SECRET"))?,
            redirect_url: env::var("REDIRECT_URL")
                .unwrap_or_else(|_| "http://localhost:8080/auth/callback".to_string()),

            service_app_client_id: env::var("SERVICE_APP_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("SERVICE_APP_CLIENT_ID"))?,
            service_app_client_secret: env::var("SERVICE_APP_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SERVICE_APP_CLIENT_SECRET"))?,
            service_app_refresh_token: env::var("SERVICE_APP_REFRESH_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SERVICE_APP_REFRESH_TOKEN"))?,

            api_base_url: env::var("WEBEX_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            auth_base_url: env::var("WEBEX_AUTH_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),

            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:8080/".to_string()),
            session_signing_key: env::var("SESSION_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("SESSION_SIGNING_KEY"))?
                .into_bytes(),
            token_cache_path: env::var("TOKEN_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("app_tokens.toml")),
            upstream_timeout_secs: env::var("UPSTREAM_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            oidc_client_id: "test_oidc_id".to_string(),
            oidc_client_secret: "test_oidc_secret".to_string(),
            redirect_url: "http://localhost:8080/auth/callback".to_string(),
            service_app_client_id: "test_sa_id".to_string(),
            service_app_client_secret: "test_sa_secret".to_string(),
            service_app_refresh_token: "test_sa_refresh".to_string(),
            api_base_url: DEFAULT_API_BASE.to_string(),
            auth_base_url: DEFAULT_API_BASE.to_string(),
            frontend_url: "http://localhost:8080/".to_string(),
            session_signing_key: b"test_session_key_32_bytes_min!!".to_vec(),
            token_cache_path: PathBuf::from("app_tokens.toml"),
            upstream_timeout_secs: 30,
            port: 8080,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
