//! Error types for keel-core

use thiserror::Error;

/// Core error type for Keel
#[derive(Error, Debug)]
pub enum CoreError {
    /// K001: Configuration file not found
    #[error("[K001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// K002: Failed to parse configuration file
    #[error("[K002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// K003: Invalid configuration value
    #[error("[K003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// K004: Migrations directory not found
    #[error("[K004] Migrations directory not found: {path}")]
    MigrationsDirNotFound { path: String },

    /// K005: Migration file name has no numeric ordering prefix
    #[error("[K005] Invalid migration name '{name}': {reason}")]
    InvalidUnitName { name: String, reason: String },

    /// K006: Two migration units share the same ordering key
    #[error("[K006] Duplicate order key {key}: '{first}' and '{second}'")]
    DuplicateOrderKey {
        key: u64,
        first: String,
        second: String,
    },

    /// K007: Version string is not a valid semantic version
    #[error("[K007] Invalid version '{value}': {reason}")]
    InvalidVersion { value: String, reason: String },

    /// K008: IO error with file path context
    #[error("[K008] IO error at {path}: {source}")]
    IoWithPath {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// K009: Generic IO error
    #[error("[K009] IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl From<serde_yaml::Error> for CoreError {
    fn from(err: serde_yaml::Error) -> Self {
        CoreError::ConfigParseError {
            message: err.to_string(),
        }
    }
}
