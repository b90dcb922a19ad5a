use serde::{Deserialize, Serialize};

/// Body of `POST /devices`
#[derive(Debug, Clone, Serialize)]
pub struct NewDevice {
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub mac_address: String,
    pub is_active: bool,
}

/// The part of the API's device response the simulator needs
#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    pub id: i64,
    pub mac_address: String,
}

/// Body of `POST /telemetries`
#[derive(Debug, Clone, Serialize)]
pub struct Telemetry {
    pub device_id: i64,
    pub data_type: &'static str,
    pub value: f64,
    pub recorded_at: String,
}
