//! Logic evaluation error types

/// Errors raised while parsing or evaluating a logic expression
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LogicError {
    #[error("Invalid argument: {0} is required")]
    InvalidArgument(&'static str),

    #[error("Unknown operator: '{0}'")]
    UnknownOperator(String),

    #[error("Malformed expression: {0}")]
    MalformedExpression(String),

    #[error("Operator '{operator}' expects {expected} argument(s), found {found}")]
    InvalidArity {
        operator: String,
        expected: String,
        found: usize,
    },

    #[error("Calculation '{name}' failed: {source}")]
    Calculation {
        name: String,
        #[source]
        source: Box<LogicError>,
    },
}

/// Result type alias for logic operations
pub type LogicResult<T> = Result<T, LogicError>;
