use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use tracing::warn;
use utoipa::OpenApi;

use super::{
    dto::{
        AckResponse, DeviceCommandDto, DeviceDto, DiagnosticsResponse, LatestReadingsParams,
        NextCommandParams, NextCommandResponse, RootResponse, SensorReadingDto, ThresholdsDto,
        ThresholdsParams,
    },
    errors::AppError,
    AppState,
};
use crate::db::models::{DeviceMode, NewCommand, NewReading, ThresholdValues, ThresholdsRequest};

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// Ingest one reading from an embedded device. Also refreshes the device's
/// heartbeat, registering it on first contact.
#[utoipa::path(
    post,
    path = "/api/readings",
    request_body = NewReading,
    responses(
        (status = 200, description = "Reading stored", body = AckResponse),
        (status = 422, description = "Validation failed"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "readings"
)]
pub async fn ingest_reading(
    State(state): State<AppState>,
    payload: Result<Json<NewReading>, JsonRejection>,
) -> Result<Json<AckResponse>, AppError> {
    let Json(payload) = payload?;
    let reading = state.readings.ingest(payload).await?;
    Ok(Json(AckResponse::ok_with_id(reading.id)))
}

/// Most recent readings, newest first.
#[utoipa::path(
    get,
    path = "/api/readings/latest",
    params(LatestReadingsParams),
    responses(
        (status = 200, description = "Latest readings", body = Vec<SensorReadingDto>),
        (status = 422, description = "Limit out of range"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "readings"
)]
pub async fn get_latest_readings(
    State(state): State<AppState>,
    params: Result<Query<LatestReadingsParams>, QueryRejection>,
) -> Result<Json<Vec<SensorReadingDto>>, AppError> {
    let Query(params) = params?;
    let rows = state
        .readings
        .latest(params.device_id.as_deref(), params.limit)
        .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// Every device that ever reported in, however long ago.
#[utoipa::path(
    get,
    path = "/api/devices",
    responses(
        (status = 200, description = "Known devices", body = Vec<DeviceDto>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "devices"
)]
pub async fn list_devices(State(state): State<AppState>) -> Result<Json<Vec<DeviceDto>>, AppError> {
    let devices = state.devices.list().await?;
    Ok(Json(devices.into_iter().map(Into::into).collect()))
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Replace the thresholds of one scope (global, or the given `device_id`).
#[utoipa::path(
    post,
    path = "/api/thresholds",
    request_body = ThresholdsRequest,
    responses(
        (status = 200, description = "Thresholds stored", body = AckResponse),
        (status = 422, description = "Validation failed"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "thresholds"
)]
pub async fn set_thresholds(
    State(state): State<AppState>,
    payload: Result<Json<ThresholdsRequest>, JsonRejection>,
) -> Result<Json<AckResponse>, AppError> {
    let Json(payload) = payload?;
    state.thresholds.set(payload).await?;
    Ok(Json(AckResponse::ok()))
}

/// Thresholds of exactly one scope; schema defaults when none are stored.
/// A device lookup does not fall back to the global record.
#[utoipa::path(
    get,
    path = "/api/thresholds",
    params(ThresholdsParams),
    responses(
        (status = 200, description = "Effective thresholds", body = ThresholdsDto),
        (status = 500, description = "Internal server error"),
    ),
    tag = "thresholds"
)]
pub async fn get_thresholds(
    State(state): State<AppState>,
    params: Result<Query<ThresholdsParams>, QueryRejection>,
) -> Result<Json<ThresholdsDto>, AppError> {
    let Query(params) = params?;
    let thresholds = state.thresholds.get(params.device_id.as_deref()).await?;
    Ok(Json(thresholds.into()))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Queue a control command for a device to pick up on its next poll.
#[utoipa::path(
    post,
    path = "/api/commands",
    request_body = NewCommand,
    responses(
        (status = 200, description = "Command queued", body = AckResponse),
        (status = 422, description = "Validation failed"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "commands"
)]
pub async fn push_command(
    State(state): State<AppState>,
    payload: Result<Json<NewCommand>, JsonRejection>,
) -> Result<Json<AckResponse>, AppError> {
    let Json(payload) = payload?;
    let command = state.commands.enqueue(payload).await?;
    Ok(Json(AckResponse::queued(command.id)))
}

/// Pop the oldest pending command for a device. The command is deleted as
/// it is returned; `command` is `null` when nothing is pending.
#[utoipa::path(
    get,
    path = "/api/commands/next",
    params(NextCommandParams),
    responses(
        (status = 200, description = "Next command or null", body = NextCommandResponse),
        (status = 400, description = "Missing device_id"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "commands"
)]
pub async fn next_command(
    State(state): State<AppState>,
    params: Result<Query<NextCommandParams>, QueryRejection>,
) -> Result<Json<NextCommandResponse>, AppError> {
    let Query(params) = params?;
    let command = state.commands.dequeue_next(&params.device_id).await?;
    Ok(Json(NextCommandResponse {
        command: command.map(DeviceCommandDto::from),
    }))
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Backend is running", body = RootResponse),
    ),
    tag = "system"
)]
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Smart IAQ backend running".to_owned(),
    })
}

/// Store connectivity report. Always answers `200`; failures are reported
/// in the body.
#[utoipa::path(
    get,
    path = "/test",
    responses(
        (status = 200, description = "Connectivity report", body = DiagnosticsResponse),
    ),
    tag = "system"
)]
pub async fn store_diagnostics(State(state): State<AppState>) -> Json<DiagnosticsResponse> {
    let database_url_set = state.config.database_url.is_some();

    let report = match state.store.diagnostics().await {
        Ok(diag) => DiagnosticsResponse::connected(diag, database_url_set),
        Err(e) => {
            warn!(error = %e, "Store diagnostics failed");
            DiagnosticsResponse::failed(
                &e.to_string(),
                database_url_set,
                state.config.database_name.clone(),
            )
        }
    };
    Json(report)
}

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI document
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        ingest_reading,
        get_latest_readings,
        list_devices,
        set_thresholds,
        get_thresholds,
        push_command,
        next_command,
        root,
        store_diagnostics,
        health,
    ),
    components(schemas(
        NewReading,
        SensorReadingDto,
        DeviceDto,
        DeviceMode,
        ThresholdsRequest,
        ThresholdValues,
        ThresholdsDto,
        NewCommand,
        DeviceCommandDto,
        NextCommandResponse,
        AckResponse,
        RootResponse,
        DiagnosticsResponse,
    )),
    tags(
        (name = "readings",   description = "Sensor reading ingestion and history"),
        (name = "devices",    description = "Device registry"),
        (name = "thresholds", description = "Alert threshold configuration"),
        (name = "commands",   description = "Pull-based device command queue"),
        (name = "system",     description = "System endpoints"),
    ),
    info(
        title = "Smart IAQ Backend API",
        version = "0.1.0",
        description = "REST API for indoor air-quality sensors and purifier devices"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
