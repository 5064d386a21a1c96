//! Error types for the pool

use thiserror::Error;

/// Boxed error returned by a create callback
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Failed to create a pooled object after {attempts} attempt(s): {source}")]
    CreationFailed {
        attempts: usize,
        #[source]
        source: BoxError,
    },

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Failed to export metrics: {0}")]
    MetricsExport(String),
}

impl PoolError {
    /// Whether this error came from the create callback
    pub fn is_creation_failure(&self) -> bool {
        matches!(self, PoolError::CreationFailed { .. })
    }
}

pub type PoolResult<T> = Result<T, PoolError>;
