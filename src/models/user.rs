// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calling user resolved at login time.

use serde::{Deserialize, Serialize};

/// The authenticated calling user, resolved once at login from the Webex
/// people API and carried in the session for its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    /// Webex person ID
    #[serde(rename = "id")]
    pub person_id: String,
    /// Display name
    #[serde(default)]
    pub display_name: String,
    /// Email addresses; the first entry is the primary address
    #[serde(default)]
    pub emails: Vec<String>,
    /// Calling location; `None` for users without calling
    #[serde(default)]
    pub location_id: Option<String>,
}

impl SessionUser {
    /// Primary email address, if the directory returned any.
    pub fn primary_email(&self) -> Option<&str> {
        self.emails.first().map(String::as_str)
    }
}
