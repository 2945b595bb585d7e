pub mod aqi;
mod service;

pub use service::{ReadingService, DEFAULT_LATEST_LIMIT, MAX_LATEST_LIMIT};
