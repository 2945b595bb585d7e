use validator::{ValidationError, ValidationErrors};

use crate::db::StoreError;

/// Failure of a core operation.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Input rejected before any state was touched.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Build a single-field validation failure for inputs that are not
/// validated through a derived `Validate` impl.
pub(crate) fn field_error(
    field: &'static str,
    code: &'static str,
    message: &'static str,
) -> ServiceError {
    let mut errors = ValidationErrors::new();
    errors.add(field, ValidationError::new(code).with_message(message.into()));
    ServiceError::Validation(errors)
}
