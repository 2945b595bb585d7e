use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    db::models::{
        Device, DeviceCommand, DeviceMode, SensorReading, StoreDiagnostics, ThresholdValues,
        Thresholds,
    },
    readings::DEFAULT_LATEST_LIMIT,
};

// ---------------------------------------------------------------------------
// Acknowledgements
// ---------------------------------------------------------------------------

/// `{"status": "ok"}` / `{"status": "queued", "id": ".."}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AckResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl AckResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_owned(),
            id: None,
        }
    }

    pub fn ok_with_id(id: impl ToString) -> Self {
        Self {
            status: "ok".to_owned(),
            id: Some(id.to_string()),
        }
    }

    pub fn queued(id: impl ToString) -> Self {
        Self {
            status: "queued".to_owned(),
            id: Some(id.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LatestReadingsParams {
    /// Restrict to one device. Empty means all devices.
    pub device_id: Option<String>,
    /// 1-1000, default 50.
    #[serde(default = "default_latest_limit")]
    pub limit: i64,
}

fn default_latest_limit() -> i64 {
    DEFAULT_LATEST_LIMIT
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SensorReadingDto {
    #[serde(rename = "_id")]
    pub id: String,
    pub device_id: String,
    pub pm2_5: f64,
    pub pm10: f64,
    pub co2: Option<f64>,
    pub tvoc: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub aqi: Option<i32>,
    pub timestamp: DateTime<Utc>,
}

impl From<SensorReading> for SensorReadingDto {
    fn from(r: SensorReading) -> Self {
        Self {
            id: r.id.to_string(),
            device_id: r.device_id,
            pm2_5: r.pm2_5,
            pm10: r.pm10,
            co2: r.co2,
            tvoc: r.tvoc,
            temperature: r.temperature,
            humidity: r.humidity,
            aqi: r.aqi,
            timestamp: r.timestamp,
        }
    }
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeviceDto {
    #[serde(rename = "_id")]
    pub id: String,
    pub device_id: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub power: bool,
    pub mode: DeviceMode,
    pub fan_speed: i16,
    pub last_seen: Option<DateTime<Utc>>,
}

impl From<Device> for DeviceDto {
    fn from(d: Device) -> Self {
        Self {
            id: d.id.to_string(),
            device_id: d.device_id,
            name: d.name,
            location: d.location,
            power: d.power,
            mode: d.mode,
            fan_speed: d.fan_speed,
            last_seen: d.last_seen,
        }
    }
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ThresholdsParams {
    /// Device scope. Absent or empty selects the global scope.
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ThresholdsDto {
    /// Present only when the record has been stored.
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub device_id: Option<String>,
    #[serde(flatten)]
    pub values: ThresholdValues,
}

impl From<Thresholds> for ThresholdsDto {
    fn from(t: Thresholds) -> Self {
        Self {
            id: t.id.map(|id| id.to_string()),
            device_id: t.device_id,
            values: t.values,
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NextCommandParams {
    pub device_id: String,
}

/// A pending command; fields that were not set on enqueue are omitted.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeviceCommandDto {
    #[serde(rename = "_id")]
    pub id: String,
    pub device_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<DeviceMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_speed: Option<i16>,
    pub created_at: DateTime<Utc>,
}

impl From<DeviceCommand> for DeviceCommandDto {
    fn from(c: DeviceCommand) -> Self {
        Self {
            id: c.id.to_string(),
            device_id: c.device_id,
            power: c.power,
            mode: c.mode,
            fan_speed: c.fan_speed,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NextCommandResponse {
    /// `null` when the queue is empty.
    pub command: Option<DeviceCommandDto>,
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RootResponse {
    pub message: String,
}

/// Human-readable store connectivity report served by `GET /test`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DiagnosticsResponse {
    pub backend: String,
    pub database: String,
    pub database_url: String,
    pub database_name: Option<String>,
    pub connection_status: String,
    pub collections: Vec<String>,
}

const MAX_REPORTED_COLLECTIONS: usize = 10;

impl DiagnosticsResponse {
    pub fn connected(diag: StoreDiagnostics, database_url_set: bool) -> Self {
        let mut collections = diag.collections;
        collections.truncate(MAX_REPORTED_COLLECTIONS);
        Self {
            backend: "running".to_owned(),
            database: format!("connected ({})", diag.backend),
            database_url: url_status(database_url_set),
            database_name: diag.database_name,
            connection_status: "Connected".to_owned(),
            collections,
        }
    }

    pub fn failed(
        error: &str,
        database_url_set: bool,
        database_name: Option<String>,
    ) -> Self {
        let error: String = error.chars().take(80).collect();
        Self {
            backend: "running".to_owned(),
            database: format!("error: {error}"),
            database_url: url_status(database_url_set),
            database_name,
            connection_status: "Not Connected".to_owned(),
            collections: Vec::new(),
        }
    }
}

fn url_status(set: bool) -> String {
    if set { "set" } else { "not set" }.to_owned()
}
