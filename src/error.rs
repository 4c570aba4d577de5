//! Error type shared by every stage of an audit job.

use thiserror::Error;

/// Errors that can occur while scanning, reporting or notifying.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Missing or invalid credential or setting.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed or incomplete trigger payload.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A call to an external service failed or returned an unusable answer.
    #[error("{service} request failed: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AuditError {
    pub fn upstream(service: &'static str, message: impl Into<String>) -> Self {
        AuditError::Upstream {
            service,
            message: message.into(),
        }
    }
}

/// Convenience alias for results with [`AuditError`].
pub type Result<T> = std::result::Result<T, AuditError>;
