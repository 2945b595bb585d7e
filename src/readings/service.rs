use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;
use validator::Validate;

use super::aqi;
use crate::{
    db::{
        models::{NewReading, SensorReading},
        Store,
    },
    devices::DeviceRegistry,
    error::{field_error, ServiceError},
};

pub const DEFAULT_LATEST_LIMIT: i64 = 50;
pub const MAX_LATEST_LIMIT: i64 = 1000;

/// Ingests device readings and serves the dashboard's recent history.
#[derive(Clone)]
pub struct ReadingService {
    store: Arc<dyn Store>,
    devices: DeviceRegistry,
}

impl ReadingService {
    pub fn new(store: Arc<dyn Store>, devices: DeviceRegistry) -> Self {
        Self { store, devices }
    }

    /// Validates and normalises `input`, stores it, then records a heartbeat
    /// for its device.
    ///
    /// Nothing is written when validation fails. The reading and the
    /// heartbeat are separate writes: if the heartbeat fails the reading
    /// stays stored and the failure is only logged.
    pub async fn ingest(&self, input: NewReading) -> Result<SensorReading, ServiceError> {
        input.validate()?;

        let reading = SensorReading {
            id: Uuid::new_v4(),
            aqi: input
                .aqi
                .or_else(|| aqi::estimate(Some(input.pm2_5), Some(input.pm10))),
            timestamp: input.timestamp.unwrap_or_else(Utc::now),
            device_id: input.device_id,
            pm2_5: input.pm2_5,
            pm10: input.pm10,
            co2: input.co2,
            tvoc: input.tvoc,
            temperature: input.temperature,
            humidity: input.humidity,
        };
        self.store.insert_reading(&reading).await?;

        if let Err(e) = self.devices.heartbeat(&reading.device_id).await {
            error!(
                device_id = %reading.device_id,
                reading_id = %reading.id,
                error = %e,
                "Reading stored but heartbeat update failed"
            );
        }

        info!(
            device_id = %reading.device_id,
            reading_id = %reading.id,
            aqi = ?reading.aqi,
            "Sensor reading ingested"
        );
        Ok(reading)
    }

    /// Newest readings first, optionally for a single device. An empty
    /// `device_id` means no filter.
    pub async fn latest(
        &self,
        device_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<SensorReading>, ServiceError> {
        if !(1..=MAX_LATEST_LIMIT).contains(&limit) {
            return Err(field_error("limit", "range", "limit must be within 1-1000"));
        }

        let device_id = device_id.filter(|id| !id.is_empty());
        Ok(self.store.latest_readings(device_id, limit).await?)
    }
}
