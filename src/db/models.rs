use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

/// Mirrors the `device_mode` Postgres enum.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "device_mode", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeviceMode {
    #[default]
    Auto,
    Manual,
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceMode::Auto => "auto",
            DeviceMode::Manual => "manual",
        };
        f.write_str(s)
    }
}

pub const DEFAULT_FAN_SPEED: i16 = 1;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Device {
    pub id: Uuid,
    /// Hardware-assigned identity, unique across the registry.
    pub device_id: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub power: bool,
    pub mode: DeviceMode,
    /// 0-5
    pub fan_speed: i16,
    pub last_seen: Option<DateTime<Utc>>,
}

impl Device {
    /// A freshly discovered device with the registry defaults.
    pub fn first_contact(device_id: &str, seen_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            device_id: device_id.to_owned(),
            name: None,
            location: None,
            power: true,
            mode: DeviceMode::Auto,
            fan_speed: DEFAULT_FAN_SPEED,
            last_seen: Some(seen_at),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor readings
// ---------------------------------------------------------------------------

/// A reading as submitted by a device, before normalisation.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewReading {
    #[validate(length(min = 1, message = "device_id must not be empty"))]
    pub device_id: String,
    /// PM2.5 µg/m³
    #[validate(range(min = 0.0, message = "pm2_5 must be >= 0"))]
    pub pm2_5: f64,
    /// PM10 µg/m³
    #[validate(range(min = 0.0, message = "pm10 must be >= 0"))]
    pub pm10: f64,
    /// CO2 ppm
    #[validate(range(min = 0.0, message = "co2 must be >= 0"))]
    pub co2: Option<f64>,
    /// Total VOC ppb
    #[validate(range(min = 0.0, message = "tvoc must be >= 0"))]
    pub tvoc: Option<f64>,
    /// Degrees Celsius
    pub temperature: Option<f64>,
    /// Relative humidity percentage
    #[validate(range(min = 0.0, max = 100.0, message = "humidity must be within 0-100"))]
    pub humidity: Option<f64>,
    /// Derived from pm2_5 / pm10 when absent.
    #[validate(range(min = 0, max = 500, message = "aqi must be within 0-500"))]
    pub aqi: Option<i32>,
    /// Defaults to ingestion time when absent.
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: Uuid,
    pub device_id: String,
    pub pm2_5: f64,
    pub pm10: f64,
    pub co2: Option<f64>,
    pub tvoc: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub aqi: Option<i32>,
    #[sqlx(rename = "recorded_at")]
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, Validate, ToSchema)]
pub struct ThresholdValues {
    #[serde(default = "defaults::pm2_5_good")]
    #[validate(range(min = 0.0, message = "pm2_5_good must be >= 0"))]
    pub pm2_5_good: f64,
    #[serde(default = "defaults::pm2_5_moderate")]
    #[validate(range(min = 0.0, message = "pm2_5_moderate must be >= 0"))]
    pub pm2_5_moderate: f64,
    #[serde(default = "defaults::pm10_good")]
    #[validate(range(min = 0.0, message = "pm10_good must be >= 0"))]
    pub pm10_good: f64,
    #[serde(default = "defaults::co2_max")]
    #[validate(range(min = 0.0, message = "co2_max must be >= 0"))]
    pub co2_max: f64,
    #[serde(default = "defaults::tvoc_max")]
    #[validate(range(min = 0.0, message = "tvoc_max must be >= 0"))]
    pub tvoc_max: f64,
}

impl Default for ThresholdValues {
    fn default() -> Self {
        Self {
            pm2_5_good: defaults::pm2_5_good(),
            pm2_5_moderate: defaults::pm2_5_moderate(),
            pm10_good: defaults::pm10_good(),
            co2_max: defaults::co2_max(),
            tvoc_max: defaults::tvoc_max(),
        }
    }
}

mod defaults {
    pub fn pm2_5_good() -> f64 {
        12.0
    }

    pub fn pm2_5_moderate() -> f64 {
        35.4
    }

    pub fn pm10_good() -> f64 {
        54.0
    }

    pub fn co2_max() -> f64 {
        1200.0
    }

    pub fn tvoc_max() -> f64 {
        500.0
    }
}

/// Body of a thresholds write. A missing or empty `device_id` targets the
/// global scope.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ThresholdsRequest {
    pub device_id: Option<String>,
    #[serde(flatten)]
    pub values: ThresholdValues,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Thresholds {
    /// `None` when the values are schema defaults that were never stored.
    pub id: Option<Uuid>,
    pub device_id: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub values: ThresholdValues,
}

// ---------------------------------------------------------------------------
// Device commands
// ---------------------------------------------------------------------------

/// A sparse control intent. Only the fields that are set represent a change.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewCommand {
    #[validate(length(min = 1, message = "device_id must not be empty"))]
    pub device_id: String,
    pub power: Option<bool>,
    pub mode: Option<DeviceMode>,
    #[validate(range(min = 0, max = 5, message = "fan_speed must be within 0-5"))]
    pub fan_speed: Option<i16>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct DeviceCommand {
    pub id: Uuid,
    pub device_id: String,
    pub power: Option<bool>,
    pub mode: Option<DeviceMode>,
    pub fan_speed: Option<i16>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct StoreDiagnostics {
    pub backend: &'static str,
    pub database_name: Option<String>,
    pub collections: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_mode_display_matches_wire_name() {
        assert_eq!(DeviceMode::Auto.to_string(), "auto");
        assert_eq!(DeviceMode::Manual.to_string(), "manual");
        assert_eq!(serde_json::to_value(DeviceMode::Manual).unwrap(), "manual");
    }

    #[test]
    fn first_contact_uses_registry_defaults() {
        let now = Utc::now();
        let device = Device::first_contact("d1", now);
        assert_eq!(device.device_id, "d1");
        assert!(device.power);
        assert_eq!(device.mode, DeviceMode::Auto);
        assert_eq!(device.fan_speed, 1);
        assert_eq!(device.last_seen, Some(now));
        assert!(device.name.is_none());
    }

    #[test]
    fn threshold_request_fills_omitted_fields_with_defaults() {
        let req: ThresholdsRequest =
            serde_json::from_value(serde_json::json!({ "device_id": "x", "co2_max": 900.0 }))
                .unwrap();
        assert_eq!(req.device_id.as_deref(), Some("x"));
        assert_eq!(req.values.co2_max, 900.0);
        assert_eq!(req.values.pm2_5_good, 12.0);
        assert_eq!(req.values.tvoc_max, 500.0);
    }

    #[test]
    fn threshold_request_rejects_negative_values() {
        let req: ThresholdsRequest =
            serde_json::from_value(serde_json::json!({ "pm10_good": -1.0 })).unwrap();
        let errors = req.values.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("pm10_good"));
    }

    #[test]
    fn command_rejects_out_of_range_fan_speed() {
        let cmd: NewCommand =
            serde_json::from_value(serde_json::json!({ "device_id": "d1", "fan_speed": 6 }))
                .unwrap();
        assert!(cmd.validate().is_err());
    }

    #[test]
    fn command_rejects_unknown_mode() {
        let res: Result<NewCommand, _> =
            serde_json::from_value(serde_json::json!({ "device_id": "d1", "mode": "turbo" }));
        assert!(res.is_err());
    }
}
