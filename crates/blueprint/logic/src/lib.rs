//! Blueprint Logic - JSON logic interpreter for workflow decisions
//!
//! Every conditional decision in a blueprint (calculations, legacy
//! participant conditions, route predicates, graph conditions) is written
//! as a small JSON logic document. This crate compiles those documents
//! into a typed [`Expr`] tree and evaluates them against a data record.
//!
//! # Operators
//!
//! | Group | Operators |
//! |---|---|
//! | Lookup | `var` |
//! | Comparison | `==` `!=` `<` `<=` `>` `>=` |
//! | Logical | `and` `or` `!` |
//! | Arithmetic | `+` `-` `*` `/` `%` (always floating point) |
//! | Control | `if` (cascading) |
//! | String | `cat` |
//!
//! # Example
//!
//! ```
//! use blueprint_logic::LogicEvaluator;
//! use serde_json::json;
//!
//! let evaluator = LogicEvaluator::new();
//! let tier = evaluator
//!     .evaluate(
//!         &json!({"if": [{">": [{"var": "amount"}, 10000]}, "director", "manager"]}),
//!         &json!({"amount": 15000}),
//!     )
//!     .unwrap();
//! assert_eq!(tier, json!("director"));
//! ```

#![deny(unsafe_code)]

pub mod cache;
pub mod error;
pub mod evaluator;
pub mod expr;
pub mod value;

pub use cache::{ExpressionCache, ExpressionKey};
pub use error::{LogicError, LogicResult};
pub use evaluator::{shared_cache, CalculationOutcome, CompiledCache, LogicEvaluator};
pub use expr::{validate_expression, Arity, Expr, Operator};
pub use value::is_truthy;

use serde_json::Value;

/// Evaluate an expression with the shared evaluator
pub fn evaluate(expression: &Value, data: &Value) -> LogicResult<Value> {
    LogicEvaluator::new().evaluate(expression, data)
}
