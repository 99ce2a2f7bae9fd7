//! Error types for configuration loading and validation.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    // Filesystem validation errors
    #[error("entry path not found: {0}")]
    EntryNotFound(PathBuf),

    // Config parsing/loading errors
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("invalid config value for '{field}': {message}")]
    InvalidValue {
        /// Name of the offending field.
        field: String,
        /// What went wrong, with a hint where one exists.
        message: String,
    },

    #[error("failed to extract configuration: {0}")]
    Extract(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
