use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use validator::ValidationErrors;

use crate::{db::StoreError, error::ServiceError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("invalid request body: {0}")]
    Body(#[from] JsonRejection),

    #[error("invalid query string: {0}")]
    Query(#[from] QueryRejection),

    #[error(transparent)]
    Store(StoreError),
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(errors) => Self::Validation(errors),
            ServiceError::Store(e) => Self::Store(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "validation failed", "fields": errors }),
            ),
            Self::Body(rejection) => (rejection.status(), json!({ "error": rejection.body_text() })),
            Self::Query(rejection) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": rejection.body_text() }),
            ),
            Self::Store(StoreError::Unavailable(msg)) => {
                tracing::error!(error = %msg, "Store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!({ "error": "store unavailable" }),
                )
            }
            Self::Store(StoreError::Database(msg)) => {
                tracing::error!(error = %msg, "Store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "database error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
