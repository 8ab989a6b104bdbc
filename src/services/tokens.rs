// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Service app token lifecycle.
//!
//! Handles:
//! - On-disk caching of the service app credential (TOML file)
//! - Lazy refresh against the identity provider when the remaining
//!   lifetime drops below the safety margin
//! - Forced refresh after an upstream 401/403

use crate::error::AppError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Margin before expiry at which a cached credential is refreshed instead of
/// used. Generous so a token can never expire mid-flight during a batch of
/// dependent calls.
const REFRESH_MARGIN_HOURS: i64 = 24;

/// Service app credential: access/refresh token pair plus absolute expiry.
///
/// Always replaced wholesale, never field-patched, so the persisted access
/// and refresh tokens are guaranteed to come from the same refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Remaining lifetime relative to now.
    pub fn remaining(&self) -> Duration {
        self.expires_at - Utc::now()
    }
}

/// File-backed store for the single service app credential.
///
/// Saves go through a temp file and an atomic rename, so a concurrent reader
/// sees either the old or the new complete document. A torn or otherwise
/// unreadable file loads as "no credential", never as an error.
#[derive(Clone, Debug)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached credential. Missing file, unreadable content, or a
    /// schema mismatch all mean "nothing cached".
    pub fn load(&self) -> Option<Credential> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match toml::from_str(&raw) {
            Ok(credential) => Some(credential),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ignoring unparseable token cache"
                );
                None
            }
        }
    }

    /// Persist a credential, replacing any previous content.
    pub fn save(&self, credential: &Credential) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("create token dir: {}", e)))?;
        }

        let serialized = toml::to_string(credential)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("serialize credential: {}", e)))?;

        let mut tmp_path = self.path.clone();
        tmp_path.set_extension("tmp");

        {
            let mut file = fs::File::create(&tmp_path).map_err(|e| {
                AppError::Internal(anyhow::anyhow!("create {}: {}", tmp_path.display(), e))
            })?;
            file.write_all(serialized.as_bytes()).map_err(|e| {
                AppError::Internal(anyhow::anyhow!("write {}: {}", tmp_path.display(), e))
            })?;
            file.sync_all().map_err(|e| {
                AppError::Internal(anyhow::anyhow!("sync {}: {}", tmp_path.display(), e))
            })?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("replace {}: {}", self.path.display(), e))
        })
    }
}

/// Token refresh response from the identity provider.
#[derive(Debug, Deserialize)]
struct TokenRefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

/// Owns the process's service app credential.
///
/// All Webex REST calls obtain their bearer token through this type; the
/// check-then-refresh decision is made lazily per call, never on a timer.
pub struct TokenManager {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    /// Refresh token seed from configuration, used until the provider
    /// rotates it.
    seed_refresh_token: String,
    store: TokenStore,
    /// Serializes the whole load-check-refresh-save sequence so two
    /// requests can never both decide to refresh.
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    pub fn new(
        client_id: String,
        client_secret: String,
        seed_refresh_token: String,
        token_url: String,
        store: TokenStore,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_url,
            client_id,
            client_secret,
            seed_refresh_token,
            store,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Get a credential with at least the refresh margin of lifetime left.
    ///
    /// Returns the cached credential when it is still fresh enough;
    /// otherwise refreshes, persists the replacement, and returns it.
    pub async fn get_credential(&self) -> Result<Credential, AppError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(credential) = self.store.load() {
            if credential.remaining() >= Duration::hours(REFRESH_MARGIN_HOURS) {
                return Ok(credential);
            }
            tracing::info!(
                expires_at = %credential.expires_at,
                "Cached access token expiring soon, refreshing"
            );
        } else {
            tracing::info!("No cached access token, refreshing");
        }

        self.refresh_locked().await
    }

    /// Refresh unconditionally. Used after an upstream 401/403 told us the
    /// cached token is no longer accepted regardless of its bookkept expiry.
    pub async fn force_refresh(&self) -> Result<Credential, AppError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Perform the refresh grant and persist the new credential.
    /// Caller must hold `refresh_lock`.
    async fn refresh_locked(&self) -> Result<Credential, AppError> {
        let refresh_token = self
            .store
            .load()
            .map(|c| c.refresh_token)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.seed_refresh_token.clone());

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::UpstreamAuth(format!("token refresh request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Token refresh rejected");
            return Err(AppError::UpstreamAuth(format!(
                "token refresh rejected with status {}",
                status
            )));
        }

        let refreshed: TokenRefreshResponse = response
            .json()
            .await
            .map_err(|e| AppError::UpstreamAuth(format!("invalid token response: {}", e)))?;

        let credential = Credential {
            access_token: refreshed.access_token,
            // The provider may omit the refresh token when it stays valid.
            refresh_token: refreshed
                .refresh_token
                .filter(|t| !t.is_empty())
                .unwrap_or(refresh_token),
            expires_at: Utc::now() + Duration::seconds(refreshed.expires_in),
        };

        // The credential is usable even if persisting it fails; the next
        // request will simply refresh again.
        if let Err(e) = self.store.save(&credential) {
            tracing::warn!(error = %e, "Failed to persist refreshed credential");
        } else {
            tracing::info!(expires_at = %credential.expires_at, "Token refreshed and cached");
        }

        Ok(credential)
    }
}
