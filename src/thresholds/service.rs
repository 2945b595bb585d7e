use std::sync::Arc;

use tracing::info;
use validator::Validate;

use super::ThresholdScope;
use crate::{
    db::{
        models::{ThresholdValues, Thresholds, ThresholdsRequest},
        Store,
    },
    error::ServiceError,
};

/// Resolves alert thresholds for the global scope or a single device.
#[derive(Clone)]
pub struct ThresholdResolver {
    store: Arc<dyn Store>,
}

impl ThresholdResolver {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Replaces the record at the request's scope. Omitted fields have
    /// already been filled with schema defaults by deserialisation, so
    /// nothing is merged with the previous record.
    pub async fn set(&self, request: ThresholdsRequest) -> Result<Thresholds, ServiceError> {
        // Flattened on the wire: errors must be keyed by the value fields.
        request.values.validate()?;

        let scope = ThresholdScope::from_device_id(request.device_id.as_deref());
        let stored = self.store.upsert_thresholds(&scope, &request.values).await?;

        info!(scope = %scope, "Thresholds updated");
        Ok(stored)
    }

    /// Looks up exactly one scope.
    ///
    /// A per-device lookup never falls back to the global record: when the
    /// device has no record of its own the schema defaults are returned,
    /// tagged with that device id.
    pub async fn get(&self, device_id: Option<&str>) -> Result<Thresholds, ServiceError> {
        let scope = ThresholdScope::from_device_id(device_id);

        let resolved = match self.store.find_thresholds(&scope).await? {
            Some(record) => record,
            None => Thresholds {
                id: None,
                device_id: scope.device_id().map(str::to_owned),
                values: ThresholdValues::default(),
            },
        };
        Ok(resolved)
    }
}
