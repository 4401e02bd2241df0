//! Error types for cryptorg-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid {field}: {value:?}")]
    InvalidDecimal { field: &'static str, value: String },

    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("{field} must be positive")]
    NotPositive { field: &'static str },

    #[error("invalid trade config: {0}")]
    InvalidConfig(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
