use thiserror::Error;

/// Errors reported back to the caller of a tracker mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    /// A required field was missing or blank. Nothing was changed.
    #[error("{field} is required")]
    Validation { field: &'static str },
}

/// Failures of the storage medium. These never leave the store; they are
/// logged and turned into a default value or a `false` save result.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("write rejected for key {0}")]
    Rejected(String),
}
