use serde_json::json;
use thiserror::Error;

use crate::schema::ValidationErrors;

const INTERNAL_MESSAGE: &str = "internal error while accessing academic records";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Conflict,
    Internal,
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("invalid data: {0}")]
    Validation(ValidationErrors),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("store failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl RecordError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecordError::InvalidInput(_) | RecordError::Validation(_) => ErrorKind::InvalidInput,
            RecordError::NotFound(_) => ErrorKind::NotFound,
            RecordError::Conflict(_) => ErrorKind::Conflict,
            RecordError::Store(_) => ErrorKind::Internal,
        }
    }

    /// The `{error, details?}` body handed back to callers. Store faults are
    /// reduced to a generic message.
    pub fn to_response(&self) -> serde_json::Value {
        match self {
            RecordError::Validation(errors) => json!({
                "error": "invalid data",
                "details": errors.details,
            }),
            RecordError::Store(_) => json!({ "error": INTERNAL_MESSAGE }),
            other => json!({ "error": other.to_string() }),
        }
    }
}

impl From<ValidationErrors> for RecordError {
    fn from(errors: ValidationErrors) -> Self {
        RecordError::Validation(errors)
    }
}
