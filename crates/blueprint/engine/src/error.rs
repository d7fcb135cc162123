use blueprint_logic::LogicError;
use blueprint_types::BlueprintError;
use thiserror::Error;

/// Errors from the blueprint engine.
///
/// Business outcomes (invalid data, a failed credential gate, graph
/// problems) are reported through result values, not through this type.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid argument: {0} is required")]
    InvalidArgument(&'static str),

    #[error("logic error: {0}")]
    Logic(#[from] LogicError),

    #[error("blueprint error: {0}")]
    Blueprint(#[from] BlueprintError),

    #[error("collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Failures reported by a pluggable collaborator (schema validator,
/// credential verifier or issuer).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("{collaborator} timed out after {timeout_ms}ms")]
    Timeout {
        collaborator: &'static str,
        timeout_ms: u64,
    },

    #[error("{collaborator} unavailable: {reason}")]
    Unavailable {
        collaborator: &'static str,
        reason: String,
    },

    #[error("{collaborator} rejected input: {reason}")]
    Rejected {
        collaborator: &'static str,
        reason: String,
    },
}

impl CollaboratorError {
    pub fn unavailable(collaborator: &'static str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            collaborator,
            reason: reason.into(),
        }
    }

    pub fn rejected(collaborator: &'static str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            collaborator,
            reason: reason.into(),
        }
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
