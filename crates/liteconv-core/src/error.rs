//! Error types for liteconv.
//!
//! Every failure surfaces to the immediate caller as a `LiteconvError`.
//! Configuration problems are detected before any backend is contacted;
//! backend failures carry the diagnostic text the converter produced.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for the liteconv library.
#[derive(Debug, Error)]
pub enum LiteconvError {
    // Configuration errors (raised while building a request)
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    // Backend selection errors
    #[error("Converter backend unavailable ({backend}): {guidance}")]
    BackendUnavailable { backend: String, guidance: String },

    // Backend failures
    #[error("Conversion failed: {message}")]
    ConversionFailed { message: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

/// Result type alias for liteconv operations.
pub type Result<T> = std::result::Result<T, LiteconvError>;

impl From<std::io::Error> for LiteconvError {
    fn from(err: std::io::Error) -> Self {
        LiteconvError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for LiteconvError {
    fn from(err: serde_json::Error) -> Self {
        LiteconvError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl LiteconvError {
    /// Shorthand for a `Config` error.
    pub fn config(message: impl Into<String>) -> Self {
        LiteconvError::Config {
            message: message.into(),
        }
    }

    /// Shorthand for a `Validation` error on a named option.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        LiteconvError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a `ConversionFailed` error.
    pub fn conversion(message: impl Into<String>) -> Self {
        LiteconvError::ConversionFailed {
            message: message.into(),
        }
    }

    /// Create an IO error with a short description of the failed step.
    pub fn io(context: &str, path: impl AsRef<Path>, err: std::io::Error) -> Self {
        LiteconvError::Io {
            message: format!("{context}: {err}"),
            path: Some(path.as_ref().to_path_buf()),
            source: Some(err),
        }
    }

    /// Whether the caller supplied an invalid or incomplete configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            LiteconvError::Config { .. } | LiteconvError::Validation { .. }
        )
    }

    /// Process exit status used by the command-line driver.
    ///
    /// - 1: conversion failed or an IO error occurred
    /// - 2: invalid configuration
    /// - 3: no usable converter backend
    pub fn exit_code(&self) -> i32 {
        match self {
            LiteconvError::Config { .. }
            | LiteconvError::Validation { .. }
            | LiteconvError::Json { .. } => 2,
            LiteconvError::BackendUnavailable { .. } => 3,
            LiteconvError::ConversionFailed { .. } | LiteconvError::Io { .. } => 1,
        }
    }
}

/// Attach a path to `std::io::Error` results.
pub trait IoResultExt<T> {
    fn with_path(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| LiteconvError::Io {
            message: e.to_string(),
            path: Some(path.as_ref().to_path_buf()),
            source: Some(e),
        })
    }
}
