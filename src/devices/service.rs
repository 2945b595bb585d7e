use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::{
    db::{models::Device, Store},
    error::{field_error, ServiceError},
};

/// Tracks known devices and their liveness.
#[derive(Clone)]
pub struct DeviceRegistry {
    store: Arc<dyn Store>,
}

impl DeviceRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Marks `device_id` as seen now, creating it with defaults on first
    /// contact. Only `last_seen` changes on an existing record.
    pub async fn heartbeat(&self, device_id: &str) -> Result<Device, ServiceError> {
        if device_id.is_empty() {
            return Err(field_error("device_id", "length", "device_id must not be empty"));
        }

        let seen_at = Utc::now();
        let device = self.store.record_heartbeat(device_id, seen_at).await?;

        debug!(
            device_id = %device_id,
            mode = %device.mode,
            last_seen = ?device.last_seen,
            "Device heartbeat recorded"
        );
        Ok(device)
    }

    /// Every known device in store-native order, however stale.
    pub async fn list(&self) -> Result<Vec<Device>, ServiceError> {
        Ok(self.store.list_devices().await?)
    }
}
