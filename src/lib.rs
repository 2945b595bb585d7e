pub mod api;
pub mod commands;
pub mod config;
pub mod db;
pub mod devices;
pub mod error;
pub mod readings;
pub mod thresholds;
