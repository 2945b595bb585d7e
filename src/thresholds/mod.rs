mod service;

pub use service::ThresholdResolver;

use std::fmt;

/// Where a thresholds record applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ThresholdScope {
    Global,
    Device(String),
}

impl ThresholdScope {
    /// `None` and the empty string both select the global scope.
    pub fn from_device_id(device_id: Option<&str>) -> Self {
        match device_id {
            Some(id) if !id.is_empty() => Self::Device(id.to_owned()),
            _ => Self::Global,
        }
    }

    pub fn device_id(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::Device(id) => Some(id),
        }
    }

    /// Unique storage key of the scope.
    pub fn key(&self) -> String {
        match self {
            Self::Global => "global".to_owned(),
            Self::Device(id) => format!("device:{id}"),
        }
    }
}

impl fmt::Display for ThresholdScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_device_id_is_global() {
        assert_eq!(ThresholdScope::from_device_id(None), ThresholdScope::Global);
        assert_eq!(ThresholdScope::from_device_id(Some("")), ThresholdScope::Global);
    }

    #[test]
    fn keys_do_not_collide() {
        // A device literally named "global" must not share the global record.
        let global = ThresholdScope::Global;
        let device = ThresholdScope::from_device_id(Some("global"));
        assert_ne!(global.key(), device.key());
        assert_eq!(device.device_id(), Some("global"));
        assert_eq!(global.device_id(), None);
    }
}
