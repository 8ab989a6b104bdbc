// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webex REST API client.
//!
//! Handles:
//! - Typed wrappers for the calling resources the portal touches
//! - Bearer auth on every call via the token manager
//! - Classification of transport/HTTP failures into a small taxonomy
//! - A single forced-refresh retry when the upstream rejects a token

use crate::error::AppError;
use crate::models::{
    AgentQueue, CallQueue, CallWaitingSetting, Device, InterceptSetting, Location, PhoneNumber,
    SessionUser,
};
use crate::services::tokens::TokenManager;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Failure classes for upstream calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 401/403: the caller should obtain a fresh credential and retry once.
    #[error("upstream rejected credential (HTTP {status})")]
    Unauthorized { status: u16 },

    /// 404: many call sites treat this as an empty result.
    #[error("resource not found")]
    NotFound,

    /// 5xx or network-level failure. Safe to retry with backoff at the
    /// caller's discretion; not retried here.
    #[error("transient upstream failure: {0}")]
    Transient(String),

    /// Other 4xx, surfaced as-is.
    #[error("upstream rejected request (HTTP {status}): {message}")]
    Client { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("failed to decode upstream response: {0}")]
    Decode(String),
}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Unauthorized { status } => {
                AppError::UpstreamAuth(format!("access token rejected with HTTP {}", status))
            }
            ApiError::NotFound => AppError::NotFound("upstream resource".to_string()),
            ApiError::Transient(msg) => AppError::Upstream(msg),
            ApiError::Client { status, message } => {
                AppError::Upstream(format!("HTTP {}: {}", status, message))
            }
            ApiError::Decode(msg) => AppError::Upstream(msg),
        }
    }
}

/// Thin typed wrapper around the Webex REST API.
#[derive(Clone)]
pub struct WebexClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ItemsResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhoneNumbersResponse {
    #[serde(default)]
    phone_numbers: Vec<PhoneNumber>,
}

#[derive(Deserialize)]
struct AgentQueuesResponse {
    #[serde(default)]
    queues: Vec<AgentQueue>,
}

/// OIDC userinfo claims the portal cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub email: String,
}

impl WebexClient {
    pub fn new(base_url: impl Into<String>, call_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(call_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    // ─── Identity ────────────────────────────────────────────────────────

    /// Fetch OIDC userinfo with the *user's* login access token.
    pub async fn userinfo(&self, access_token: &str) -> Result<UserInfo, ApiError> {
        let url = format!("{}/userinfo", self.base_url);
        self.get_json(&url, access_token, &[]).await
    }

    /// Find the calling user for an email address: the first directory entry
    /// whose primary email matches and that has a calling location.
    pub async fn find_calling_user(
        &self,
        access_token: &str,
        email: &str,
    ) -> Result<Option<SessionUser>, ApiError> {
        let url = format!("{}/people", self.base_url);
        let people: ItemsResponse<SessionUser> = self
            .get_json(&url, access_token, &[("email", email), ("callingData", "true")])
            .await?;

        Ok(people.items.into_iter().find(|person| {
            person.primary_email() == Some(email) && person.location_id.is_some()
        }))
    }

    // ─── Locations and numbers ───────────────────────────────────────────

    pub async fn location_details(
        &self,
        access_token: &str,
        location_id: &str,
    ) -> Result<Location, ApiError> {
        let url = format!("{}/locations/{}", self.base_url, location_id);
        self.get_json(&url, access_token, &[]).await
    }

    pub async fn phone_numbers(
        &self,
        access_token: &str,
        owner_id: &str,
    ) -> Result<Vec<PhoneNumber>, ApiError> {
        let url = format!("{}/telephony/config/numbers", self.base_url);
        let response: PhoneNumbersResponse = self
            .get_json(&url, access_token, &[("ownerId", owner_id)])
            .await?;
        Ok(response.phone_numbers)
    }

    // ─── Devices ─────────────────────────────────────────────────────────

    pub async fn list_devices(
        &self,
        access_token: &str,
        person_id: &str,
    ) -> Result<Vec<Device>, ApiError> {
        let url = format!("{}/devices", self.base_url);
        let response: ItemsResponse<Device> = self
            .get_json(&url, access_token, &[("personId", person_id)])
            .await?;
        Ok(response.items)
    }

    // ─── Call queues ─────────────────────────────────────────────────────

    /// List the queues an agent belongs to. 404 means the agent has no
    /// queue data for this variant and is mapped by the caller, not here.
    pub async fn agent_queues(
        &self,
        access_token: &str,
        agent_id: &str,
        has_cx_essentials: bool,
    ) -> Result<Vec<AgentQueue>, ApiError> {
        let url = format!("{}/telephony/config/agents/{}/queues", self.base_url, agent_id);
        let cx = if has_cx_essentials { "true" } else { "false" };
        let response: AgentQueuesResponse = self
            .get_json(&url, access_token, &[("hasCxEssentials", cx), ("max", "50")])
            .await?;
        Ok(response.queues)
    }

    pub async fn queue_details(
        &self,
        access_token: &str,
        location_id: &str,
        queue_id: &str,
    ) -> Result<CallQueue, ApiError> {
        let url = format!(
            "{}/telephony/config/locations/{}/queues/{}",
            self.base_url, location_id, queue_id
        );
        self.get_json(&url, access_token, &[]).await
    }

    /// Push a modified queue detail back. The upstream API has no partial
    /// update; the full object is resent.
    pub async fn update_queue(
        &self,
        access_token: &str,
        location_id: &str,
        queue_id: &str,
        detail: &CallQueue,
    ) -> Result<(), ApiError> {
        let url = format!(
            "{}/telephony/config/locations/{}/queues/{}",
            self.base_url, location_id, queue_id
        );
        let response = self
            .http
            .put(&url)
            .bearer_auth(access_token)
            .json(detail)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        Self::check_status(response).await.map(|_| ())
    }

    // ─── Person settings ─────────────────────────────────────────────────

    pub async fn call_intercept(
        &self,
        access_token: &str,
        person_id: &str,
    ) -> Result<InterceptSetting, ApiError> {
        let url = format!("{}/people/{}/features/intercept", self.base_url, person_id);
        self.get_json(&url, access_token, &[]).await
    }

    pub async fn configure_call_intercept(
        &self,
        access_token: &str,
        person_id: &str,
        enabled: bool,
    ) -> Result<(), ApiError> {
        let url = format!("{}/people/{}/features/intercept", self.base_url, person_id);
        self.put_setting(&url, access_token, enabled).await
    }

    pub async fn call_waiting(
        &self,
        access_token: &str,
        person_id: &str,
    ) -> Result<CallWaitingSetting, ApiError> {
        let url = format!("{}/people/{}/features/callWaiting", self.base_url, person_id);
        self.get_json(&url, access_token, &[]).await
    }

    pub async fn configure_call_waiting(
        &self,
        access_token: &str,
        person_id: &str,
        enabled: bool,
    ) -> Result<(), ApiError> {
        let url = format!("{}/people/{}/features/callWaiting", self.base_url, person_id);
        self.put_setting(&url, access_token, enabled).await
    }

    // ─── Plumbing ────────────────────────────────────────────────────────

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let mut request = self.http.get(url).bearer_auth(access_token);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request.send().await.map_err(|e| classify_transport(&e))?;

        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(format!("JSON parse error: {}", e)))
    }

    async fn put_setting(
        &self,
        url: &str,
        access_token: &str,
        enabled: bool,
    ) -> Result<(), ApiError> {
        let response = self
            .http
            .put(url)
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "enabled": enabled }))
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        Self::check_status(response).await.map(|_| ())
    }

    /// Classify a non-success status into the error taxonomy.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ApiError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if status.as_u16() == 404 {
            return Err(ApiError::NotFound);
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            tracing::warn!(status = %status, "Transient upstream failure");
            return Err(ApiError::Transient(format!("HTTP {}: {}", status, body)));
        }

        Err(ApiError::Client {
            status: status.as_u16(),
            message: body,
        })
    }
}

fn classify_transport(e: &reqwest::Error) -> ApiError {
    ApiError::Transient(format!("transport error: {}", e))
}

// ─────────────────────────────────────────────────────────────────────────────
// WebexService - credential-aware wrapper used by the request handlers
// ─────────────────────────────────────────────────────────────────────────────

/// High-level Webex service: attaches the current service app credential to
/// every call and performs at most one forced-refresh retry when the
/// upstream rejects the token.
#[derive(Clone)]
pub struct WebexService {
    client: WebexClient,
    tokens: Arc<TokenManager>,
}

impl WebexService {
    pub fn new(client: WebexClient, tokens: Arc<TokenManager>) -> Self {
        Self { client, tokens }
    }

    /// Run one upstream call with the current credential; on 401/403 force a
    /// refresh and retry exactly once.
    async fn with_credential<T, F, Fut>(&self, call: F) -> Result<T, AppError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let credential = self.tokens.get_credential().await?;
        match call(credential.access_token).await {
            Err(ApiError::Unauthorized { status }) => {
                tracing::info!(status, "Access token rejected upstream, forcing refresh");
                let credential = self.tokens.force_refresh().await?;
                call(credential.access_token).await.map_err(AppError::from)
            }
            other => other.map_err(AppError::from),
        }
    }

    /// Fetch OIDC userinfo with a user's login token (no service credential
    /// involved, so no refresh retry either).
    pub async fn userinfo(&self, user_access_token: &str) -> Result<UserInfo, AppError> {
        Ok(self.client.userinfo(user_access_token).await?)
    }

    pub async fn find_calling_user(&self, email: &str) -> Result<Option<SessionUser>, AppError> {
        self.with_credential(|token| async move {
            self.client.find_calling_user(&token, email).await
        })
        .await
    }

    pub async fn location_details(&self, location_id: &str) -> Result<Location, AppError> {
        self.with_credential(|token| async move {
            self.client.location_details(&token, location_id).await
        })
        .await
    }

    pub async fn phone_numbers(&self, owner_id: &str) -> Result<Vec<PhoneNumber>, AppError> {
        self.with_credential(|token| async move {
            self.client.phone_numbers(&token, owner_id).await
        })
        .await
    }

    pub async fn list_devices(&self, person_id: &str) -> Result<Vec<Device>, AppError> {
        self.with_credential(|token| async move {
            self.client.list_devices(&token, person_id).await
        })
        .await
    }

    pub async fn agent_queues(
        &self,
        agent_id: &str,
        has_cx_essentials: bool,
    ) -> Result<Vec<AgentQueue>, AppError> {
        self.with_credential(|token| async move {
            self.client
                .agent_queues(&token, agent_id, has_cx_essentials)
                .await
        })
        .await
    }

    pub async fn queue_details(
        &self,
        location_id: &str,
        queue_id: &str,
    ) -> Result<CallQueue, AppError> {
        self.with_credential(|token| async move {
            self.client.queue_details(&token, location_id, queue_id).await
        })
        .await
    }

    pub async fn update_queue(
        &self,
        location_id: &str,
        queue_id: &str,
        detail: &CallQueue,
    ) -> Result<(), AppError> {
        self.with_credential(|token| async move {
            self.client
                .update_queue(&token, location_id, queue_id, detail)
                .await
        })
        .await
    }

    pub async fn call_intercept(&self, person_id: &str) -> Result<InterceptSetting, AppError> {
        self.with_credential(|token| async move {
            self.client.call_intercept(&token, person_id).await
        })
        .await
    }

    pub async fn configure_call_intercept(
        &self,
        person_id: &str,
        enabled: bool,
    ) -> Result<(), AppError> {
        self.with_credential(|token| async move {
            self.client
                .configure_call_intercept(&token, person_id, enabled)
                .await
        })
        .await
    }

    pub async fn call_waiting(&self, person_id: &str) -> Result<CallWaitingSetting, AppError> {
        self.with_credential(|token| async move {
            self.client.call_waiting(&token, person_id).await
        })
        .await
    }

    pub async fn configure_call_waiting(
        &self,
        person_id: &str,
        enabled: bool,
    ) -> Result<(), AppError> {
        self.with_credential(|token| async move {
            self.client
                .configure_call_waiting(&token, person_id, enabled)
                .await
        })
        .await
    }
}
