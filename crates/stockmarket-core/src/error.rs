//! Error types for stockmarket-core.

use thiserror::Error;

/// Core validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Unknown share: {0}")]
    InvalidShare(String),

    #[error("Invalid difficulty: {0}. Choose 1-4")]
    InvalidDifficulty(i64),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid goal amount: {0}")]
    InvalidTarget(i64),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
