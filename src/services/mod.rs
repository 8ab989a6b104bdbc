// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - token lifecycle and upstream API access.

pub mod tokens;
pub mod webex;

pub use tokens::{Credential, TokenManager, TokenStore};
pub use webex::{ApiError, WebexClient, WebexService};
