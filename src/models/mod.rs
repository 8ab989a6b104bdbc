// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod telephony;
pub mod user;

pub use telephony::{
    Agent, AgentQueue, CallQueue, CallWaitingSetting, Device, InterceptSetting, Location,
    PhoneNumber, PhoneNumberType, ProductType,
};
pub use user::SessionUser;
