//! Crate-level error type shared by the service layer

use crate::reference::ParseError;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors raised by the service layer.
///
/// Validation and not-found errors are raised immediately to the calling
/// tool; they are never converted into a low-confidence success. Quality
/// degradation (warnings, confidence penalties) is the only soft-failure
/// mechanism in the crate.
#[derive(Debug, Error)]
pub enum WeftError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("reference not found: {0}")]
    NotFound(String),

    #[error("no entity matched key '{key}' and create_if_missing was false")]
    NoMatch { key: String },

    #[error("invalid state for {subject}: expected {expected}, found {actual}")]
    InvalidState {
        subject: String,
        expected: String,
        actual: String,
    },

    #[error("workflow {workflow_id}: step {attempted} is behind recorded step {last}")]
    OutOfOrder {
        workflow_id: String,
        last: u32,
        attempted: u32,
    },

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for service operations
pub type WeftResult<T> = Result<T, WeftError>;
