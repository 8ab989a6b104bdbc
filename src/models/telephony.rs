// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wire models for the Webex telephony resources the portal touches.
//!
//! The upstream API speaks camelCase; the portal's own responses keep the
//! snake_case field names the frontend tables are bound to, so most structs
//! rename on deserialize only.

use serde::{Deserialize, Serialize};

/// Location detail (only the fields the portal surfaces).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct Location {
    pub id: String,
    pub name: String,
}

/// Phone number type, ordered so that a descending sort puts primary
/// numbers first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhoneNumberType {
    /// Catch-all for types the portal does not model; sorts last.
    // Declared last so `#[serde(other)]` is valid; explicit discriminants
    // preserve the original declaration-order Ord (Unknown lowest).
    Alternate = 1,
    FaxMessage = 2,
    Primary = 3,
    #[serde(other)]
    Unknown = 0,
}

/// One entry of a user's phone number list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct PhoneNumber {
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub location: Option<NumberLocation>,
    pub phone_number_type: PhoneNumberType,
}

/// Location reference embedded in a phone number entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct NumberLocation {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

/// Device product type. Only phones are surfaced by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Phone,
    Roomdesk,
    Accessory,
    #[serde(other)]
    Unknown,
}

/// Device list entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct Device {
    pub product: String,
    /// MAC address as received: 12 hex chars, no separators
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub connection_status: Option<String>,
    #[serde(rename(deserialize = "type"))]
    pub product_type: ProductType,
}

/// Queue reference from the agent's queue list (stage 1 of the membership
/// view).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct AgentQueue {
    pub id: String,
    pub location_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location_name: String,
    #[serde(default)]
    pub extension: Option<String>,
}

/// Agent entry inside a call queue detail.
///
/// Queue updates are full-object PUTs; fields the portal does not model are
/// kept in `rest` so they survive the round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    #[serde(rename = "id")]
    pub agent_id: String,
    #[serde(rename = "joinEnabled", default)]
    pub join_enabled: bool,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

/// Call queue detail (stage 2 of the membership view, and the object that
/// gets resent wholesale on a join update).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallQueue {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(rename = "allowAgentJoinEnabled", default)]
    pub allow_agent_join_enabled: bool,
    #[serde(default)]
    pub agents: Vec<Agent>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

/// Call intercept setting for a person.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterceptSetting {
    pub enabled: bool,
}

/// Call waiting setting for a person.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallWaitingSetting {
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_number_type_descending_puts_primary_first() {
        let mut types = vec![
            PhoneNumberType::Alternate,
            PhoneNumberType::Primary,
            PhoneNumberType::FaxMessage,
        ];
        types.sort_by(|a, b| b.cmp(a));
        assert_eq!(
            types,
            vec![
                PhoneNumberType::Primary,
                PhoneNumberType::FaxMessage,
                PhoneNumberType::Alternate,
            ]
        );
    }

    #[test]
    fn test_call_queue_round_trips_unmodeled_fields() {
        let detail: CallQueue = serde_json::from_value(serde_json::json!({
            "name": "Helpdesk",
            "extension": "4001",
            "allowAgentJoinEnabled": true,
            "queueSize": 25,
            "agents": [
                {"id": "agent-1", "joinEnabled": false, "firstName": "Ada"}
            ]
        }))
        .unwrap();

        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["queueSize"], 25);
        assert_eq!(value["agents"][0]["firstName"], "Ada");
        assert_eq!(value["agents"][0]["joinEnabled"], false);
    }

    #[test]
    fn test_device_type_parses_unknown_products() {
        let device: Device = serde_json::from_value(serde_json::json!({
            "product": "Board 55",
            "type": "whiteboard",
            "connectionStatus": "connected"
        }))
        .unwrap();
        assert_eq!(device.product_type, ProductType::Unknown);
    }
}
