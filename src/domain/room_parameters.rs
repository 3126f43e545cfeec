//! Room parameter domain types
//!
//! Measurable room attributes (floor area, perimeter, ...) whose values feed
//! the quantities of linked catalog works.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Room parameter entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomParameter {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A value entered for a parameter on an estimate or a room
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RoomParameterValue {
    pub parameter_id: Uuid,
    pub value: f64,
}

/// Request DTO for creating a room parameter
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoomParameterRequest {
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Request DTO for updating a room parameter
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRoomParameterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

fn default_true() -> bool {
    true
}
