// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Calling user portal backend.
//!
//! Users sign in with Webex OIDC and manage their own calling configuration
//! (phone numbers, devices, call-queue membership, call intercept/waiting)
//! through the Webex REST API using a shared service-app credential.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use services::WebexService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub webex: WebexService,
}
