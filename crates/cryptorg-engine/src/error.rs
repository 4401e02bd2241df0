//! Engine error types.

use thiserror::Error;

/// Errors surfaced by the order service and the trade engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error(transparent)]
    Core(#[from] cryptorg_core::CoreError),

    #[error(transparent)]
    Exchange(#[from] cryptorg_exchange::ExchangeError),
}

impl EngineError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
