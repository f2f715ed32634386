//! Port for the append-only status log.

use crate::status::domain::{SampleWindow, ServerSampleCounts, StatusSample};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for status log operations.
pub type StatusLogResult<T> = Result<T, StatusLogError>;

/// Append-only time series of status samples.
#[async_trait]
pub trait StatusLog: Send + Sync {
    /// Appends one sample. Duplicates are allowed.
    async fn append(&self, sample: &StatusSample) -> StatusLogResult<()>;

    /// Returns per-server tallies for samples inside `window`.
    ///
    /// Only servers with at least one sample in the window appear, ordered
    /// by internal identifier, and at most `limit` of them are returned.
    async fn window_counts(
        &self,
        window: &SampleWindow,
        limit: usize,
    ) -> StatusLogResult<Vec<ServerSampleCounts>>;
}

/// Errors returned by status log implementations.
#[derive(Debug, Clone, Error)]
pub enum StatusLogError {
    /// Stored data could not be converted into domain values.
    #[error("invalid stored status sample: {0}")]
    InvalidStoredData(Arc<dyn std::error::Error + Send + Sync>),

    /// Backend failure.
    #[error("status log backend error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl StatusLogError {
    /// Wraps a stored-data conversion failure.
    pub fn invalid_stored_data(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidStoredData(Arc::new(err))
    }

    /// Wraps a backend failure.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}

impl From<diesel::result::Error> for StatusLogError {
    fn from(err: diesel::result::Error) -> Self {
        Self::backend(err)
    }
}
