use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{
        models::{DeviceCommand, NewCommand},
        Store,
    },
    error::{field_error, ServiceError},
};

/// Per-device FIFO of pending control commands, drained by device polls.
///
/// Delivery is at-most-once: a dequeued command is gone from the store
/// before it is handed to the caller, and nothing is ever re-queued.
#[derive(Clone)]
pub struct CommandQueue {
    store: Arc<dyn Store>,
}

impl CommandQueue {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Appends `command` to its device's queue. The device does not have to
    /// be known yet.
    pub async fn enqueue(&self, command: NewCommand) -> Result<DeviceCommand, ServiceError> {
        command.validate()?;

        let pending = DeviceCommand {
            id: Uuid::new_v4(),
            device_id: command.device_id,
            power: command.power,
            mode: command.mode,
            fan_speed: command.fan_speed,
            created_at: Utc::now(),
        };
        let queued = self.store.push_command(&pending).await?;

        info!(
            device_id = %queued.device_id,
            command_id = %queued.id,
            power = ?queued.power,
            mode = ?queued.mode,
            fan_speed = ?queued.fan_speed,
            "Command queued"
        );
        Ok(queued)
    }

    /// Removes and returns the oldest pending command for `device_id`, or
    /// `None` when the queue is empty.
    pub async fn dequeue_next(&self, device_id: &str) -> Result<Option<DeviceCommand>, ServiceError> {
        if device_id.is_empty() {
            return Err(field_error("device_id", "length", "device_id must not be empty"));
        }

        let command = self.store.pop_oldest_command(device_id).await?;
        match &command {
            Some(c) => info!(device_id = %device_id, command_id = %c.id, "Command delivered"),
            None => debug!(device_id = %device_id, "No pending command"),
        }
        Ok(command)
    }
}
