//! Error types for the bookkeeping store and the migration engine.

use keel_core::{CoreError, InstallState, Operation};
use keel_db::DbError;
use thiserror::Error;

/// Bookkeeping store errors.
#[derive(Error, Debug)]
pub enum MetaError {
    /// The persistence backend cannot be reached (M001).
    #[error("[M001] Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// SQL execution error against a bookkeeping table (M002).
    #[error("[M002] Bookkeeping query failed: {0}")]
    QueryError(String),

    /// A persisted row could not be decoded (M003).
    #[error("[M003] Corrupt bookkeeping record: {0}")]
    CorruptRecord(String),
}

/// Result type alias for [`MetaError`].
pub type MetaResult<T> = Result<T, MetaError>;

impl From<DbError> for MetaError {
    fn from(err: DbError) -> Self {
        if err.is_unavailable() {
            MetaError::StorageUnavailable(err.to_string())
        } else {
            MetaError::QueryError(err.to_string())
        }
    }
}

impl From<duckdb::Error> for MetaError {
    fn from(err: duckdb::Error) -> Self {
        MetaError::QueryError(err.to_string())
    }
}

/// Adds a context label to bookkeeping query errors.
pub(crate) trait MetaResultExt<T> {
    fn meta_context(self, what: &str) -> MetaResult<T>;
}

impl<T> MetaResultExt<T> for Result<T, duckdb::Error> {
    fn meta_context(self, what: &str) -> MetaResult<T> {
        self.map_err(|e| MetaError::QueryError(format!("{what}: {e}")))
    }
}

/// Migration engine errors.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Cannot reach the persistence backend; nothing was run (G001).
    #[error("[G001] Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Catalog or configuration error, e.g. a duplicate order key (G002).
    #[error("[G002] {0}")]
    Catalog(#[from] CoreError),

    /// A statement inside a unit failed; the unit was rolled back (G003).
    #[error("[G003] Migration '{filename}' failed: {cause}")]
    UnitExecutionFailed { filename: String, cause: String },

    /// The requested operation is not valid in the current state (G004).
    #[error("[G004] Cannot {operation} while {state}")]
    InvalidStateTransition {
        operation: Operation,
        state: InstallState,
    },

    /// Another run holds the advisory lock (G005).
    #[error("[G005] A run is already in progress ({state}, run id {})", .run_id.as_deref().unwrap_or("unknown"))]
    ConcurrentRunDetected {
        state: InstallState,
        run_id: Option<String>,
    },

    /// Target version is older than the stored version (G006).
    #[error("[G006] Refusing to move schema version from {stored} back to {target}")]
    DowngradeRefused { stored: String, target: String },

    /// Bookkeeping store error (G007).
    #[error("[G007] {0}")]
    Meta(MetaError),
}

/// Result type alias for [`EngineError`].
pub type EngineResult<T> = Result<T, EngineError>;

impl From<MetaError> for EngineError {
    fn from(err: MetaError) -> Self {
        match err {
            MetaError::StorageUnavailable(msg) => EngineError::StorageUnavailable(msg),
            other => EngineError::Meta(other),
        }
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        MetaError::from(err).into()
    }
}
