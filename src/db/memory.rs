use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    models::{Device, DeviceCommand, SensorReading, StoreDiagnostics, ThresholdValues, Thresholds},
    Store, StoreResult, COLLECTIONS,
};
use crate::thresholds::ThresholdScope;

#[derive(Default)]
struct Collections {
    /// Insertion order is the store-native listing order.
    devices: Vec<Device>,
    readings: Vec<SensorReading>,
    thresholds: HashMap<String, Thresholds>,
    /// One FIFO per device, oldest at the front.
    commands: HashMap<String, VecDeque<DeviceCommand>>,
}

/// Process-local store with the same contract as [`super::PgStore`].
///
/// Wrapped in `Arc` so it can be cheaply cloned and shared across tasks.
/// Each operation takes a single guard for its whole duration, which makes
/// find-or-create and find-and-remove atomic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_reading(&self, reading: &SensorReading) -> StoreResult<()> {
        self.inner.write().await.readings.push(reading.clone());
        Ok(())
    }

    async fn latest_readings(
        &self,
        device_id: Option<&str>,
        limit: i64,
    ) -> StoreResult<Vec<SensorReading>> {
        let guard = self.inner.read().await;
        // Reverse first so that equal timestamps keep newest-inserted first
        // through the stable sort.
        let mut rows: Vec<SensorReading> = guard
            .readings
            .iter()
            .rev()
            .filter(|r| device_id.map_or(true, |id| r.device_id == id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        rows.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn record_heartbeat(
        &self,
        device_id: &str,
        seen_at: DateTime<Utc>,
    ) -> StoreResult<Device> {
        let mut guard = self.inner.write().await;
        if let Some(device) = guard.devices.iter_mut().find(|d| d.device_id == device_id) {
            device.last_seen = Some(device.last_seen.map_or(seen_at, |prev| prev.max(seen_at)));
            return Ok(device.clone());
        }

        let device = Device::first_contact(device_id, seen_at);
        guard.devices.push(device.clone());
        Ok(device)
    }

    async fn list_devices(&self) -> StoreResult<Vec<Device>> {
        Ok(self.inner.read().await.devices.clone())
    }

    async fn upsert_thresholds(
        &self,
        scope: &ThresholdScope,
        values: &ThresholdValues,
    ) -> StoreResult<Thresholds> {
        let mut guard = self.inner.write().await;
        let record = guard
            .thresholds
            .entry(scope.key())
            .and_modify(|existing| existing.values = values.clone())
            .or_insert_with(|| Thresholds {
                id: Some(Uuid::new_v4()),
                device_id: scope.device_id().map(str::to_owned),
                values: values.clone(),
            });
        Ok(record.clone())
    }

    async fn find_thresholds(&self, scope: &ThresholdScope) -> StoreResult<Option<Thresholds>> {
        Ok(self.inner.read().await.thresholds.get(&scope.key()).cloned())
    }

    async fn push_command(&self, command: &DeviceCommand) -> StoreResult<DeviceCommand> {
        let mut guard = self.inner.write().await;
        let queue = guard.commands.entry(command.device_id.clone()).or_default();

        let mut stored = command.clone();
        if let Some(newest) = queue.back() {
            stored.created_at = stored
                .created_at
                .max(newest.created_at + Duration::microseconds(1));
        }
        queue.push_back(stored.clone());
        Ok(stored)
    }

    async fn pop_oldest_command(&self, device_id: &str) -> StoreResult<Option<DeviceCommand>> {
        let mut guard = self.inner.write().await;
        let Some(queue) = guard.commands.get_mut(device_id) else {
            return Ok(None);
        };
        let command = queue.pop_front();
        if queue.is_empty() {
            guard.commands.remove(device_id);
        }
        Ok(command)
    }

    async fn diagnostics(&self) -> StoreResult<StoreDiagnostics> {
        Ok(StoreDiagnostics {
            backend: "memory",
            database_name: None,
            collections: COLLECTIONS.iter().map(|c| (*c).to_owned()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(device_id: &str, created_at: DateTime<Utc>) -> DeviceCommand {
        DeviceCommand {
            id: Uuid::new_v4(),
            device_id: device_id.to_owned(),
            power: None,
            mode: None,
            fan_speed: Some(2),
            created_at,
        }
    }

    fn reading(device_id: &str, timestamp: DateTime<Utc>) -> SensorReading {
        SensorReading {
            id: Uuid::new_v4(),
            device_id: device_id.to_owned(),
            pm2_5: 1.0,
            pm10: 1.0,
            co2: None,
            tvoc: None,
            temperature: None,
            humidity: None,
            aqi: Some(5),
            timestamp,
        }
    }

    #[tokio::test]
    async fn pop_on_unknown_device_is_empty() {
        let store = MemoryStore::new();
        assert!(store.pop_oldest_command("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clock_step_backwards_keeps_enqueue_order() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let first = command("d1", now);
        let second = command("d1", now - Duration::seconds(1));
        store.push_command(&first).await.unwrap();
        let stored = store.push_command(&second).await.unwrap();
        assert!(stored.created_at > first.created_at);

        assert_eq!(store.pop_oldest_command("d1").await.unwrap().unwrap().id, first.id);
        let popped = store.pop_oldest_command("d1").await.unwrap().unwrap();
        assert_eq!(popped.id, second.id);
        assert_eq!(popped.created_at, stored.created_at);
        assert!(store.pop_oldest_command("d1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn equal_created_at_is_made_strictly_increasing() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let first = store.push_command(&command("d1", now)).await.unwrap();
        let second = store.push_command(&command("d1", now)).await.unwrap();
        assert!(second.created_at > first.created_at);

        assert_eq!(store.pop_oldest_command("d1").await.unwrap().unwrap().id, first.id);
        assert_eq!(store.pop_oldest_command("d1").await.unwrap().unwrap().id, second.id);
    }

    #[tokio::test]
    async fn other_devices_do_not_shift_created_at() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.push_command(&command("a", now)).await.unwrap();
        let b = command("b", now - Duration::seconds(1));
        assert_eq!(store.push_command(&b).await.unwrap().created_at, b.created_at);
    }

    #[tokio::test]
    async fn latest_readings_newest_first_with_limit() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let old = reading("d1", now - Duration::minutes(2));
        let mid = reading("d2", now - Duration::minutes(1));
        let new = reading("d1", now);
        for r in [&mid, &new, &old] {
            store.insert_reading(r).await.unwrap();
        }

        let all = store.latest_readings(None, 50).await.unwrap();
        assert_eq!(
            all.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![new.id, mid.id, old.id]
        );

        let d1 = store.latest_readings(Some("d1"), 1).await.unwrap();
        assert_eq!(d1.len(), 1);
        assert_eq!(d1[0].id, new.id);
    }

    #[tokio::test]
    async fn heartbeat_never_moves_last_seen_backwards() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.record_heartbeat("d1", now).await.unwrap();
        let device = store
            .record_heartbeat("d1", now - Duration::seconds(30))
            .await
            .unwrap();
        assert_eq!(device.last_seen, Some(now));
        assert_eq!(store.list_devices().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upsert_keeps_record_id() {
        let store = MemoryStore::new();
        let scope = ThresholdScope::Global;
        let first = store
            .upsert_thresholds(&scope, &ThresholdValues::default())
            .await
            .unwrap();
        let values = ThresholdValues {
            co2_max: 800.0,
            ..ThresholdValues::default()
        };
        let second = store.upsert_thresholds(&scope, &values).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.values.co2_max, 800.0);
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let store = MemoryStore::new();
        let clone = store.clone();
        store.record_heartbeat("d1", Utc::now()).await.unwrap();
        assert_eq!(clone.list_devices().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn diagnostics_lists_collections() {
        let diag = MemoryStore::new().diagnostics().await.unwrap();
        assert_eq!(diag.backend, "memory");
        assert_eq!(diag.collections, COLLECTIONS.to_vec());
    }
}
