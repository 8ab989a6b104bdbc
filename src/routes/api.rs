// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.
//!
//! Each view is a stateless pipeline: independent upstream calls run in one
//! concurrent batch, dependent calls are sequenced after their dependency,
//! and the results are merged into a single response.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Agent, AgentQueue, CallQueue, PhoneNumber, ProductType};
use crate::AppState;
use axum::{
    extract::State,
    routing::get,
    Extension, Json, Router,
};
use futures_util::{stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Upper bound on in-flight upstream calls per fan-out batch.
const MAX_CONCURRENT_CALLS: usize = 10;

/// API routes (require a session; the auth middleware is applied in
/// routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/userinfo", get(get_userinfo))
        .route("/api/userphones", get(get_userphones))
        .route("/api/userqueues", get(get_userqueues).post(post_userqueues))
        .route("/api/useroptions", get(get_useroptions).post(post_useroptions))
}

// ─── User profile view ───────────────────────────────────────

#[derive(Serialize)]
pub struct UserInfoResponse {
    /// Phone numbers sorted primary-first
    pub numbers: Vec<PhoneNumber>,
    pub location_name: String,
}

/// Location details and phone numbers of the logged-in user, fetched
/// concurrently and merged.
async fn get_userinfo(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserInfoResponse>> {
    let user = &auth.user;

    // A session without a calling location should not exist (login filters
    // for it); degrade to an empty view instead of failing.
    let Some(location_id) = user.location_id.as_deref() else {
        tracing::warn!(person_id = %user.person_id, "Session user has no location");
        return Ok(Json(UserInfoResponse {
            numbers: vec![],
            location_name: String::new(),
        }));
    };

    tracing::debug!(person_id = %user.person_id, "Fetching location details and numbers");
    let (location, mut numbers) = tokio::try_join!(
        state.webex.location_details(location_id),
        state.webex.phone_numbers(&user.person_id),
    )?;

    numbers.sort_by(|a, b| b.phone_number_type.cmp(&a.phone_number_type));

    Ok(Json(UserInfoResponse {
        numbers,
        location_name: location.name,
    }))
}

// ─── User devices view ───────────────────────────────────────

#[derive(Serialize)]
pub struct UserPhonesResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<PhoneRow>>,
}

#[derive(Serialize)]
pub struct PhoneRow {
    pub model: String,
    pub mac: String,
    pub status: String,
}

/// Phones of the current user. Upstream failures surface as a structured
/// `{success: false}` body, not an error status.
async fn get_userphones(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Json<UserPhonesResponse> {
    let user = &auth.user;

    tracing::debug!(person_id = %user.person_id, "Fetching user phones");
    let devices = match state.webex.list_devices(&user.person_id).await {
        Ok(devices) => devices,
        Err(e) => {
            tracing::error!(error = %e, "Fetching user phones failed");
            return Json(UserPhonesResponse {
                success: false,
                message: Some(e.to_string()),
                rows: None,
            });
        }
    };

    let rows = devices
        .into_iter()
        .filter(|d| d.product_type == ProductType::Phone)
        .map(|d| PhoneRow {
            model: d.product,
            mac: d.mac.as_deref().map(mac_with_colons).unwrap_or_default(),
            status: d.connection_status.unwrap_or_default(),
        })
        .collect();

    Json(UserPhonesResponse {
        success: true,
        message: None,
        rows: Some(rows),
    })
}

/// Reformat a MAC address received as 12 hex chars into colon-separated
/// octets for display.
fn mac_with_colons(mac: &str) -> String {
    mac.as_bytes()
        .chunks(2)
        .map(|octet| String::from_utf8_lossy(octet).to_lowercase())
        .collect::<Vec<_>>()
        .join(":")
}

// ─── Call-queue membership view ──────────────────────────────

#[derive(Serialize)]
pub struct UserQueuesResponse {
    pub success: bool,
    pub rows: Vec<QueueRow>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct QueueRow {
    pub name: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub join_info: JoinInfo,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct JoinInfo {
    pub joined: bool,
    /// Composite id in the format "location_id.queue_id"
    pub location_and_queue_id: String,
    pub allow_join_enabled: bool,
}

/// Queues the current user is an agent of, with their join state.
///
/// Stage 1 fetches the agent's queue references with and without the CX
/// essentials variant concurrently; stage 2 fans out one detail fetch per
/// reference with bounded concurrency; stage 3 joins details back against
/// the user's agent entry without further I/O.
async fn get_userqueues(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserQueuesResponse>> {
    let user = &auth.user;

    tracing::debug!(person_id = %user.person_id, "Fetching agent queue references");
    let (mut references, with_cx_essentials) = tokio::try_join!(
        agent_queues_or_empty(&state, &user.person_id, false),
        agent_queues_or_empty(&state, &user.person_id, true),
    )?;
    references.extend(with_cx_essentials);

    tracing::debug!(
        count = references.len(),
        "Fetching call queue details for queues the user is agent of"
    );
    let webex = &state.webex;
    let detail_keys: Vec<(String, String)> = references
        .iter()
        .map(|q| (q.location_id.clone(), q.id.clone()))
        .collect();
    let details: Vec<CallQueue> = stream::iter(detail_keys)
        .map(|(location_id, queue_id)| async move {
            webex.queue_details(&location_id, &queue_id).await
        })
        .buffered(MAX_CONCURRENT_CALLS)
        .try_collect()
        .await?;

    let rows = rows_for_agent(&references, &details, &user.person_id);

    Ok(Json(UserQueuesResponse {
        success: true,
        rows,
    }))
}

/// Queue references for one variant of the agent queue listing; a 404 means
/// the variant has no data for this user and yields an empty list.
async fn agent_queues_or_empty(
    state: &Arc<AppState>,
    person_id: &str,
    has_cx_essentials: bool,
) -> Result<Vec<AgentQueue>> {
    match state.webex.agent_queues(person_id, has_cx_essentials).await {
        Ok(queues) => Ok(queues),
        Err(AppError::NotFound(_)) => Ok(vec![]),
        Err(e) => Err(e),
    }
}

/// Join queue references with their details, keeping only queues where the
/// user actually appears as an agent. Preserves reference order.
fn rows_for_agent(references: &[AgentQueue], details: &[CallQueue], person_id: &str) -> Vec<QueueRow> {
    references
        .iter()
        .zip(details)
        .filter_map(|(reference, detail)| {
            let agent = find_agent(detail, person_id)?;
            Some(QueueRow {
                name: reference.name.clone(),
                location: reference.location_name.clone(),
                extension: reference.extension.clone(),
                join_info: JoinInfo {
                    joined: agent.join_enabled,
                    location_and_queue_id: format!(
                        "{}.{}",
                        reference.location_id, reference.id
                    ),
                    allow_join_enabled: detail.allow_agent_join_enabled,
                },
            })
        })
        .collect()
}

fn find_agent<'a>(detail: &'a CallQueue, person_id: &str) -> Option<&'a Agent> {
    detail.agents.iter().find(|a| a.agent_id == person_id)
}

// ─── Call-queue membership update ────────────────────────────

#[derive(Deserialize)]
pub struct QueueJoinUpdate {
    /// Composite id in the format "location_id.queue_id"
    pub id: String,
    /// New joined state
    pub checked: bool,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Update the user's join state for one queue. The upstream API only
/// supports full-object updates, so the detail is fetched, patched in
/// memory, and resent wholesale.
async fn post_userqueues(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(update): Json<QueueJoinUpdate>,
) -> Result<Json<SuccessResponse>> {
    let user = &auth.user;

    let (location_id, queue_id) = update
        .id
        .split_once('.')
        .filter(|(location_id, queue_id)| !location_id.is_empty() && !queue_id.is_empty())
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "id must have the format \"location_id.queue_id\", got \"{}\"",
                update.id
            ))
        })?;

    tracing::debug!(id = %update.id, "Fetching call queue details");
    let mut detail = state.webex.queue_details(location_id, queue_id).await?;

    // Unlike the read path, asserting membership in a queue the user is not
    // an agent of is an error.
    let agent = detail
        .agents
        .iter_mut()
        .find(|a| a.agent_id == user.person_id)
        .ok_or_else(|| {
            AppError::NotFound(format!("user is not an agent of queue \"{}\"", update.id))
        })?;
    agent.join_enabled = update.checked;

    tracing::debug!(queue = %detail.name, joined = update.checked, "Updating call queue");
    state
        .webex
        .update_queue(location_id, queue_id, &detail)
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}

// ─── User options view ───────────────────────────────────────

#[derive(Serialize)]
pub struct UserOptionsResponse {
    pub success: bool,
    #[serde(rename = "callIntercept")]
    pub call_intercept: bool,
    #[serde(rename = "callWaiting")]
    pub call_waiting: bool,
}

/// Call intercept and call waiting status, fetched concurrently.
async fn get_useroptions(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserOptionsResponse>> {
    let user = &auth.user;

    tracing::debug!(person_id = %user.person_id, "Fetching call intercept and call waiting");
    let (intercept, waiting) = tokio::try_join!(
        state.webex.call_intercept(&user.person_id),
        state.webex.call_waiting(&user.person_id),
    )?;

    Ok(Json(UserOptionsResponse {
        success: true,
        call_intercept: intercept.enabled,
        call_waiting: waiting.enabled,
    }))
}

/// The two settings a user can toggle. Closed set: unknown ids fail at
/// deserialization before any upstream call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OptionId {
    CallIntercept,
    CallWaiting,
}

#[derive(Deserialize)]
pub struct OptionsUpdate {
    pub id: OptionId,
    pub checked: bool,
}

/// Update one of the user options.
async fn post_useroptions(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(update): Json<OptionsUpdate>,
) -> Result<Json<SuccessResponse>> {
    let user = &auth.user;

    tracing::debug!(option = ?update.id, enabled = update.checked, "Updating user option");
    match update.id {
        OptionId::CallIntercept => {
            state
                .webex
                .configure_call_intercept(&user.person_id, update.checked)
                .await?
        }
        OptionId::CallWaiting => {
            state
                .webex
                .configure_call_waiting(&user.person_id, update.checked)
                .await?
        }
    }

    Ok(Json(SuccessResponse { success: true }))
}
