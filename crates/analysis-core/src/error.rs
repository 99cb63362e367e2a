use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream timed out after {0:?}")]
    UpstreamTimeout(Duration),

    #[error("Cache corruption: {0}")]
    CacheCorruption(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AnalysisError {
    /// Whether the caller may retry the same request and expect a different outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnalysisError::UpstreamUnavailable(_)
                | AnalysisError::UpstreamTimeout(_)
                | AnalysisError::CacheError(_)
                | AnalysisError::DatabaseError(_)
        )
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
