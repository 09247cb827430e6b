//! Error types for dataset access.

use std::path::Path;

use thiserror::Error;

use crate::mode::AccessMode;
use crate::topology::Gpi;

/// Errors that can occur while opening, reading or writing a dataset.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// Handle re-opened with a mode different from the one it was created with.
    #[error("{path}: handle is {current}, requested {requested}")]
    ModeMismatch {
        path: String,
        current: AccessMode,
        requested: AccessMode,
    },

    /// Grid point absent from the topology mapping.
    #[error("unknown grid point: {0}")]
    UnknownGridPoint(Gpi),

    /// Query shape not supported by the addressed store.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Backing resource could not be acquired.
    #[error("resource unavailable: {path}: {reason}")]
    ResourceUnavailable { path: String, reason: String },

    /// Operation on a handle that was never opened.
    #[error("handle not open: {0}")]
    NotOpen(String),

    /// Operation on a handle or dataset after it was closed.
    #[error("handle closed: {0}")]
    Closed(String),

    /// Column required for row selection is missing.
    #[error("missing column: {0}")]
    MissingColumn(String),

    /// Incoming rows do not match the existing column layout.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Serialization or deserialization failure.
    #[error("codec error: {0}")]
    Codec(String),

    /// Storage/IO error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DatasetError {
    /// Create a ModeMismatch error.
    pub fn mode_mismatch(path: &Path, current: AccessMode, requested: AccessMode) -> Self {
        Self::ModeMismatch {
            path: path.display().to_string(),
            current,
            requested,
        }
    }

    /// Create a ResourceUnavailable error.
    pub fn unavailable(path: &Path, reason: impl ToString) -> Self {
        Self::ResourceUnavailable {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an InvalidQuery error.
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    /// Create a Codec error.
    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    /// Create a SchemaMismatch error.
    pub fn schema_mismatch(msg: impl Into<String>) -> Self {
        Self::SchemaMismatch(msg.into())
    }
}

impl From<std::io::Error> for DatasetError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for DatasetError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;
