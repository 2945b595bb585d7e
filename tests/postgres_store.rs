//! Store tests against a live Postgres. Run with
//! `DATABASE_URL=postgres://.. cargo test --features postgres-tests`.
#![cfg(feature = "postgres-tests")]

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use iaq_service::{
    db::{
        models::{DeviceCommand, DeviceMode, SensorReading, ThresholdValues},
        PgStore, Store,
    },
    thresholds::ThresholdScope,
};

fn command(device_id: &str, fan_speed: i16, offset_ms: i64) -> DeviceCommand {
    DeviceCommand {
        id: Uuid::new_v4(),
        device_id: device_id.to_owned(),
        power: None,
        mode: None,
        fan_speed: Some(fan_speed),
        created_at: Utc::now() + Duration::milliseconds(offset_ms),
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn commands_dequeue_in_enqueue_order(pool: PgPool) {
    let store = PgStore::new(pool);
    let first = command("d1", 2, 0);
    let second = command("d1", 1, -1_000);
    store.push_command(&first).await.unwrap();
    let stored = store.push_command(&second).await.unwrap();
    assert!(stored.created_at > first.created_at);
    store.push_command(&command("d2", 5, -5_000)).await.unwrap();

    assert_eq!(store.pop_oldest_command("d1").await.unwrap().unwrap().id, first.id);
    assert_eq!(store.pop_oldest_command("d1").await.unwrap().unwrap().id, second.id);
    assert!(store.pop_oldest_command("d1").await.unwrap().is_none());
    assert_eq!(
        store.pop_oldest_command("d2").await.unwrap().unwrap().fan_speed,
        Some(5)
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_pops_deliver_each_command_once(pool: PgPool) {
    let store = std::sync::Arc::new(PgStore::new(pool));
    for i in 0..20 {
        store.push_command(&command("d1", (i % 6) as i16, i)).await.unwrap();
    }

    let mut pollers = tokio::task::JoinSet::new();
    for _ in 0..4 {
        let store = store.clone();
        pollers.spawn(async move {
            let mut ids = Vec::new();
            while let Some(c) = store.pop_oldest_command("d1").await.unwrap() {
                ids.push(c.id);
            }
            ids
        });
    }

    let mut delivered = Vec::new();
    while let Some(ids) = pollers.join_next().await {
        delivered.extend(ids.unwrap());
    }
    let total = delivered.len();
    delivered.sort();
    delivered.dedup();
    assert_eq!(total, 20);
    assert_eq!(delivered.len(), 20);
}

#[sqlx::test(migrations = "./migrations")]
async fn heartbeat_creates_once_and_never_moves_backwards(pool: PgPool) {
    let store = PgStore::new(pool);
    let now = Utc::now();

    let created = store.record_heartbeat("d1", now).await.unwrap();
    assert!(created.power);
    assert_eq!(created.mode, DeviceMode::Auto);
    assert_eq!(created.fan_speed, 1);

    let stale = store
        .record_heartbeat("d1", now - Duration::minutes(5))
        .await
        .unwrap();
    assert_eq!(stale.id, created.id);
    assert!(stale.last_seen >= created.last_seen);

    let devices = store.list_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn thresholds_are_scoped_and_replaced(pool: PgPool) {
    let store = PgStore::new(pool);
    let device = ThresholdScope::Device("X".into());

    assert!(store.find_thresholds(&ThresholdScope::Global).await.unwrap().is_none());

    let first = store
        .upsert_thresholds(
            &device,
            &ThresholdValues {
                pm2_5_good: 9.0,
                ..ThresholdValues::default()
            },
        )
        .await
        .unwrap();
    let second = store
        .upsert_thresholds(&device, &ThresholdValues::default())
        .await
        .unwrap();
    assert_eq!(first.id, second.id);

    let found = store.find_thresholds(&device).await.unwrap().unwrap();
    assert_eq!(found.device_id.as_deref(), Some("X"));
    assert_eq!(found.values, ThresholdValues::default());
    assert!(store.find_thresholds(&ThresholdScope::Global).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn latest_readings_newest_first(pool: PgPool) {
    let store = PgStore::new(pool);
    let base = Utc::now();
    for (i, device) in ["a", "b", "a"].iter().enumerate() {
        store
            .insert_reading(&SensorReading {
                id: Uuid::new_v4(),
                device_id: (*device).to_owned(),
                pm2_5: i as f64,
                pm10: 0.0,
                co2: None,
                tvoc: None,
                temperature: None,
                humidity: None,
                aqi: Some(i as i32),
                timestamp: base + Duration::seconds(i as i64),
            })
            .await
            .unwrap();
    }

    let all = store.latest_readings(None, 10).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].aqi, Some(2));

    let a = store.latest_readings(Some("a"), 1).await.unwrap();
    assert_eq!(a.len(), 1);
    assert_eq!(a[0].device_id, "a");
    assert_eq!(a[0].aqi, Some(2));
}

#[sqlx::test(migrations = "./migrations")]
async fn diagnostics_list_tables(pool: PgPool) {
    let store = PgStore::new(pool);
    let diag = store.diagnostics().await.unwrap();
    assert_eq!(diag.backend, "postgres");
    assert!(diag.collections.iter().any(|c| c == "device_commands"));
    assert!(diag.collections.iter().all(|c| !c.starts_with("_sqlx")));
}
