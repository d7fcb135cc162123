//! Blueprint error types

/// Errors raised while loading or saving a blueprint
#[derive(Debug, thiserror::Error)]
pub enum BlueprintError {
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for blueprint operations
pub type BlueprintResult<T> = Result<T, BlueprintError>;
