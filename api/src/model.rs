use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered API user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Builds a user with a timestamp-derived id (`usr_<unix nanos>`).
    pub fn new(username: String, email: String) -> Self {
        let now = Utc::now();
        Self {
            id: format!("usr_{}", now.timestamp_nanos_opt().unwrap_or_default()),
            username,
            email,
            created_at: now,
        }
    }
}

/// Physical IoT device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub mac_address: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Only populated when a single device is fetched
    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub telemetries: Vec<Telemetry>,
}

/// Single reading reported by a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Telemetry {
    pub id: i64,
    pub device_id: i64,
    pub data_type: String,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Device fields supplied by the caller; the store assigns id and timestamps
#[derive(Debug, Clone)]
pub struct NewDevice {
    pub name: String,
    pub device_type: String,
    pub mac_address: String,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct NewTelemetry {
    pub device_id: i64,
    pub data_type: String,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateDeviceRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub mac_address: String,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateTelemetryRequest {
    pub device_id: i64,
    pub data_type: String,
    pub value: f64,
    pub recorded_at: Option<String>,
}

/// Response body of `GET /me`
#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub message: String,
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
