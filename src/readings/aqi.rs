//! Approximate air quality index used when a device does not report one.
//!
//! This is a monotonic, bounded heuristic on a 0-500 scale, not an official
//! AQI breakpoint table.

pub const AQI_MAX: i32 = 500;

const PM2_5_WEIGHT: f64 = 5.0;
const PM10_WEIGHT: f64 = 2.0;

/// `max(pm2_5 * 5, pm10 * 2)` clamped to `0..=500` and truncated.
///
/// A missing input counts as zero; `None` only when both are missing.
pub fn estimate(pm2_5: Option<f64>, pm10: Option<f64>) -> Option<i32> {
    if pm2_5.is_none() && pm10.is_none() {
        return None;
    }

    let sub_index = |value: Option<f64>, weight: f64| {
        (value.unwrap_or(0.0) * weight).clamp(0.0, f64::from(AQI_MAX))
    };
    let aqi = sub_index(pm2_5, PM2_5_WEIGHT).max(sub_index(pm10, PM10_WEIGHT));
    Some(aqi as i32)
}
