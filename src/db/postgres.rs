use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    models::{Device, DeviceCommand, SensorReading, StoreDiagnostics, ThresholdValues, Thresholds},
    Store, StoreResult,
};
use crate::thresholds::ThresholdScope;

const DEVICE_COLUMNS: &str = "id, device_id, name, location, power, mode, fan_speed, last_seen";
const THRESHOLD_COLUMNS: &str =
    "id, device_id, pm2_5_good, pm2_5_moderate, pm10_good, co2_max, tvoc_max";

/// Postgres-backed store. Queue and registry atomicity come from single
/// statements; nothing is locked in-process.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_reading(&self, reading: &SensorReading) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sensor_readings
                (id, device_id, pm2_5, pm10, co2, tvoc,
                 temperature, humidity, aqi, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(reading.id)
        .bind(&reading.device_id)
        .bind(reading.pm2_5)
        .bind(reading.pm10)
        .bind(reading.co2)
        .bind(reading.tvoc)
        .bind(reading.temperature)
        .bind(reading.humidity)
        .bind(reading.aqi)
        .bind(reading.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest_readings(
        &self,
        device_id: Option<&str>,
        limit: i64,
    ) -> StoreResult<Vec<SensorReading>> {
        let rows = sqlx::query_as::<_, SensorReading>(
            r#"
            SELECT id, device_id, pm2_5, pm10, co2, tvoc,
                   temperature, humidity, aqi, recorded_at
            FROM sensor_readings
            WHERE ($1::text IS NULL OR device_id = $1)
            ORDER BY recorded_at DESC, seq DESC
            LIMIT $2
            "#,
        )
        .bind(device_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn record_heartbeat(
        &self,
        device_id: &str,
        seen_at: DateTime<Utc>,
    ) -> StoreResult<Device> {
        // GREATEST skips NULL, so a device created without a heartbeat
        // still picks up the new timestamp.
        let device = sqlx::query_as::<_, Device>(&format!(
            r#"
            INSERT INTO devices (id, device_id, last_seen)
            VALUES ($1, $2, $3)
            ON CONFLICT (device_id) DO UPDATE
                SET last_seen = GREATEST(devices.last_seen, EXCLUDED.last_seen)
            RETURNING {DEVICE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(device_id)
        .bind(seen_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(device)
    }

    async fn list_devices(&self) -> StoreResult<Vec<Device>> {
        let devices = sqlx::query_as::<_, Device>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(devices)
    }

    async fn upsert_thresholds(
        &self,
        scope: &ThresholdScope,
        values: &ThresholdValues,
    ) -> StoreResult<Thresholds> {
        let record = sqlx::query_as::<_, Thresholds>(&format!(
            r#"
            INSERT INTO thresholds
                (id, scope_key, device_id, pm2_5_good, pm2_5_moderate,
                 pm10_good, co2_max, tvoc_max)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (scope_key) DO UPDATE SET
                device_id      = EXCLUDED.device_id,
                pm2_5_good     = EXCLUDED.pm2_5_good,
                pm2_5_moderate = EXCLUDED.pm2_5_moderate,
                pm10_good      = EXCLUDED.pm10_good,
                co2_max        = EXCLUDED.co2_max,
                tvoc_max       = EXCLUDED.tvoc_max,
                updated_at     = now()
            RETURNING {THRESHOLD_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(scope.key())
        .bind(scope.device_id())
        .bind(values.pm2_5_good)
        .bind(values.pm2_5_moderate)
        .bind(values.pm10_good)
        .bind(values.co2_max)
        .bind(values.tvoc_max)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    async fn find_thresholds(&self, scope: &ThresholdScope) -> StoreResult<Option<Thresholds>> {
        let record = sqlx::query_as::<_, Thresholds>(&format!(
            "SELECT {THRESHOLD_COLUMNS} FROM thresholds WHERE scope_key = $1"
        ))
        .bind(scope.key())
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn push_command(&self, command: &DeviceCommand) -> StoreResult<DeviceCommand> {
        // GREATEST ignores the NULL max of an empty queue.
        let stored = sqlx::query_as::<_, DeviceCommand>(
            r#"
            INSERT INTO device_commands (id, device_id, power, mode, fan_speed, created_at)
            VALUES (
                $1, $2, $3, $4, $5,
                GREATEST(
                    $6,
                    (SELECT max(created_at) + interval '1 microsecond'
                     FROM device_commands WHERE device_id = $2)
                )
            )
            RETURNING id, device_id, power, mode, fan_speed, created_at
            "#,
        )
        .bind(command.id)
        .bind(&command.device_id)
        .bind(command.power)
        .bind(command.mode)
        .bind(command.fan_speed)
        .bind(command.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn pop_oldest_command(&self, device_id: &str) -> StoreResult<Option<DeviceCommand>> {
        // seq is the enqueue order. SKIP LOCKED lets a racing poll take the
        // next command instead of coming back empty after waiting on the row
        // this one removes.
        let command = sqlx::query_as::<_, DeviceCommand>(
            r#"
            DELETE FROM device_commands
            WHERE id = (
                SELECT id FROM device_commands
                WHERE device_id = $1
                ORDER BY seq
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, device_id, power, mode, fan_speed, created_at
            "#,
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(command)
    }

    async fn diagnostics(&self) -> StoreResult<StoreDiagnostics> {
        let database_name: String = sqlx::query_scalar("SELECT current_database()::text")
            .fetch_one(&self.pool)
            .await?;

        let collections: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = current_schema()
              AND table_name NOT LIKE '\_sqlx%'
            ORDER BY table_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(StoreDiagnostics {
            backend: "postgres",
            database_name: Some(database_name),
            collections,
        })
    }
}
