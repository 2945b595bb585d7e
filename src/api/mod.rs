pub mod dto;
pub mod errors;
pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    commands::CommandQueue, config::Config, db::Store, devices::DeviceRegistry,
    readings::ReadingService, thresholds::ThresholdResolver,
};
use handlers::ApiDoc;

/// Shared handler state. Every service holds the same store handle.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub readings: ReadingService,
    pub devices: DeviceRegistry,
    pub thresholds: ThresholdResolver,
    pub commands: CommandQueue,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let devices = DeviceRegistry::new(store.clone());
        Self {
            readings: ReadingService::new(store.clone(), devices.clone()),
            thresholds: ThresholdResolver::new(store.clone()),
            commands: CommandQueue::new(store.clone()),
            devices,
            store,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/", get(handlers::root))
        .route("/test", get(handlers::store_diagnostics))
        .route("/api/readings", axum::routing::post(handlers::ingest_reading))
        .route("/api/readings/latest", get(handlers::get_latest_readings))
        .route("/api/devices", get(handlers::list_devices))
        .route(
            "/api/thresholds",
            get(handlers::get_thresholds).post(handlers::set_thresholds),
        )
        .route("/api/commands", axum::routing::post(handlers::push_command))
        .route("/api/commands/next", get(handlers::next_command))
        .with_state(state)
        .split_for_parts();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
