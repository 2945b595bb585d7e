pub mod memory;
pub mod models;
pub mod postgres;

use std::{str::FromStr, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::info;

use crate::{
    config::{Config, StoreBackend},
    thresholds::ThresholdScope,
};
use models::{Device, DeviceCommand, SensorReading, StoreDiagnostics, ThresholdValues, Thresholds};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Logical collection names exposed by every backend.
pub const COLLECTIONS: [&str; 4] = ["device", "sensorreading", "thresholds", "devicecommand"];

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => Self::Unavailable(e.to_string()),
            other => Self::Database(other.to_string()),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The document store the core components talk to.
///
/// Every method is a single atomic operation from the caller's point of
/// view; no method holds any in-process lock across an await on the
/// network.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_reading(&self, reading: &SensorReading) -> StoreResult<()>;

    /// Newest first, optionally restricted to one device.
    async fn latest_readings(
        &self,
        device_id: Option<&str>,
        limit: i64,
    ) -> StoreResult<Vec<SensorReading>>;

    /// Find-or-create keyed on `device_id`. An existing record only has its
    /// `last_seen` moved forward; a new one starts from registry defaults.
    async fn record_heartbeat(&self, device_id: &str, seen_at: DateTime<Utc>)
        -> StoreResult<Device>;

    async fn list_devices(&self) -> StoreResult<Vec<Device>>;

    /// Replaces the whole record at `scope`, creating it if absent.
    async fn upsert_thresholds(
        &self,
        scope: &ThresholdScope,
        values: &ThresholdValues,
    ) -> StoreResult<Thresholds>;

    async fn find_thresholds(&self, scope: &ThresholdScope) -> StoreResult<Option<Thresholds>>;

    /// Appends to the device's queue and returns the stored command. The
    /// stored `created_at` is moved past the newest pending command of the
    /// same device when the clock reads earlier, so pending `created_at`
    /// values always increase in enqueue order.
    async fn push_command(&self, command: &DeviceCommand) -> StoreResult<DeviceCommand>;

    /// Removes and returns the oldest pending command for `device_id`.
    async fn pop_oldest_command(&self, device_id: &str) -> StoreResult<Option<DeviceCommand>>;

    async fn diagnostics(&self) -> StoreResult<StoreDiagnostics>;
}

pub async fn create_pool(config: &Config) -> Result<PgPool> {
    let url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required for the postgres store")?;

    let mut options = PgConnectOptions::from_str(url).context("DATABASE_URL is not a valid URL")?;
    if let Some(name) = &config.database_name {
        options = options.database(name);
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Opens the configured backend. The handle lives for the whole process and
/// is passed to each component at construction.
pub async fn connect(config: &Config) -> Result<Arc<dyn Store>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let pool = create_pool(config).await?;
            run_migrations(&pool).await?;
            info!("Postgres store ready");
            Ok(Arc::new(PgStore::new(pool)))
        }
        StoreBackend::Memory => {
            info!("In-memory store ready; data is lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
