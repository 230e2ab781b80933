// Engine Errors - Validation, numeric and data availability failures
// Every failure is terminal for the call and reported as-is to the caller

use serde::Serialize;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Input field outside its declared domain. Never clamped.
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// A non-finite intermediate value was produced (overflow, NaN).
    #[error("numeric degeneracy in {quantity}: value is not finite")]
    NumericDegeneracy { quantity: String },

    /// A required read-only table is missing or empty.
    #[error("{dataset} unavailable: {reason}")]
    DataUnavailable { dataset: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn degenerate(quantity: &str) -> Self {
        Self::NumericDegeneracy {
            quantity: quantity.to_string(),
        }
    }

    pub fn unavailable(dataset: &str, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            dataset: dataset.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable kind, used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::NumericDegeneracy { .. } => "numeric_degeneracy",
            Self::DataUnavailable { .. } => "data_unavailable",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        let field = match self {
            Self::Validation { field, .. } => Some(field.clone()),
            _ => None,
        };
        ErrorPayload {
            kind: self.kind(),
            field,
            message: self.to_string(),
        }
    }
}

/// Serializable error body for the JSON transport
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

/// Reject NaN and infinities with a `NumericDegeneracy` error.
pub fn ensure_finite(quantity: &str, value: f64) -> EngineResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EngineError::degenerate(quantity))
    }
}
