//! Error handling for zpack
//!
//! Every fallible operation in the crate returns [`ZpackError`]. Each variant
//! maps to a stable error code so batch runs can count failures by category.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for zpack operations
pub type Result<T> = std::result::Result<T, ZpackError>;

/// Main error type for zpack operations
#[derive(Error, Debug)]
pub enum ZpackError {
    // File Errors
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to read file: {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}: {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory creation failed: {path}: {source}")]
    DirectoryCreateError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Container Errors
    #[error("Not a recognized container: {reason}")]
    MalformedContainer { reason: String },

    #[error("Container too large: {reason}")]
    ContainerOverflow { reason: String },

    #[error("Invalid coefficient blob: {reason}")]
    MalformedCoefficientBlob { reason: String },

    // Record Errors
    #[error("Record {id} is {actual} bytes, expected {expected}")]
    WrongLength {
        id: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Preset header too short: {len} bytes (minimum {min})")]
    HeaderTooShort { len: usize, min: usize },

    #[error("Preset sequence incomplete: missing {missing:?}")]
    IncompleteSequence { missing: Vec<u16> },

    #[error("Preset sequence number {seq} received more than once")]
    DuplicateSequence { seq: u16 },

    // Configuration Errors
    #[error("Invalid device specification: {reason}")]
    InvalidDeviceSpec { reason: String },

    #[error("Invalid pole model '{name}': {reason}")]
    InvalidPoleModel { name: String, reason: String },

    #[error("Invalid frame count {count} (valid range: 1..=64)")]
    InvalidFrameCount { count: usize },

    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ZpackError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            ZpackError::FileNotFound { .. } => "FILE_NOT_FOUND",
            ZpackError::FileReadError { .. } => "FILE_READ_ERROR",
            ZpackError::FileWriteError { .. } => "FILE_WRITE_ERROR",
            ZpackError::DirectoryCreateError { .. } => "DIRECTORY_CREATE_ERROR",
            ZpackError::MalformedContainer { .. } => "MALFORMED_CONTAINER",
            ZpackError::ContainerOverflow { .. } => "CONTAINER_OVERFLOW",
            ZpackError::MalformedCoefficientBlob { .. } => "MALFORMED_COEFFICIENT_BLOB",
            ZpackError::WrongLength { .. } => "WRONG_LENGTH",
            ZpackError::HeaderTooShort { .. } => "HEADER_TOO_SHORT",
            ZpackError::IncompleteSequence { .. } => "INCOMPLETE_SEQUENCE",
            ZpackError::DuplicateSequence { .. } => "DUPLICATE_SEQUENCE",
            ZpackError::InvalidDeviceSpec { .. } => "INVALID_DEVICE_SPEC",
            ZpackError::InvalidPoleModel { .. } => "INVALID_POLE_MODEL",
            ZpackError::InvalidFrameCount { .. } => "INVALID_FRAME_COUNT",
            ZpackError::InvalidPattern { .. } => "INVALID_PATTERN",
            ZpackError::Io(_) => "IO_ERROR",
            ZpackError::Json(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if a batch run can move on to the next file after this error.
    ///
    /// Configuration errors affect every file equally, so they are not.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ZpackError::InvalidDeviceSpec { .. }
                | ZpackError::InvalidPoleModel { .. }
                | ZpackError::InvalidFrameCount { .. }
                | ZpackError::InvalidPattern { .. }
        )
    }
}
