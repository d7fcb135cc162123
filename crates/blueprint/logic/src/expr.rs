//! Expression AST: JSON logic documents compiled into a typed tree
//!
//! Logic expressions are authored as JSON. An object with exactly one key
//! is an operator node (`{"op": args}`), an array is a list node, and any
//! other value is a literal. Parsing checks operator names against the
//! closed [`Operator`] set and argument counts against each operator's
//! [`Arity`], so evaluation never has to re-inspect the document shape.

use crate::error::{LogicError, LogicResult};
use serde_json::Value;

// ── Operators ────────────────────────────────────────────────────────

/// The closed set of operators the evaluator understands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    If,
    Cat,
}

impl Operator {
    pub const ALL: [Operator; 16] = [
        Operator::Eq,
        Operator::NotEq,
        Operator::Lt,
        Operator::Le,
        Operator::Gt,
        Operator::Ge,
        Operator::And,
        Operator::Or,
        Operator::Not,
        Operator::Add,
        Operator::Sub,
        Operator::Mul,
        Operator::Div,
        Operator::Mod,
        Operator::If,
        Operator::Cat,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "!",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::If => "if",
            Self::Cat => "cat",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Self::Eq | Self::NotEq | Self::Lt | Self::Le | Self::Gt | Self::Ge => Arity::Exactly(2),
            Self::Div | Self::Mod => Arity::Exactly(2),
            Self::Not => Arity::Exactly(1),
            Self::Sub => Arity::Between(1, 2),
            Self::And | Self::Or | Self::Add | Self::Mul | Self::If => Arity::AtLeast(1),
            Self::Cat => Arity::AtLeast(0),
        }
    }

    /// Comparison and logical operators: the ones that yield booleans
    pub fn is_predicate(&self) -> bool {
        matches!(
            self,
            Self::Eq
                | Self::NotEq
                | Self::Lt
                | Self::Le
                | Self::Gt
                | Self::Ge
                | Self::And
                | Self::Or
                | Self::Not
        )
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Number of arguments an operator accepts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
    Between(usize, usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Between(lo, hi) => (lo..=hi).contains(&count),
        }
    }

    pub(crate) fn check(&self, op: Operator, count: usize) -> LogicResult<()> {
        if self.accepts(count) {
            Ok(())
        } else {
            Err(LogicError::InvalidArity {
                operator: op.name().to_string(),
                expected: self.to_string(),
                found: count,
            })
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "{}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
            Arity::Between(lo, hi) => write!(f, "{} to {}", lo, hi),
        }
    }
}

// ── Expression tree ──────────────────────────────────────────────────

/// A parsed logic expression
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Scalar literal: null, bool, number or string
    Literal(Value),
    /// Array node; each element is itself an expression
    List(Vec<Expr>),
    /// Data lookup by dot-separated path, with an optional fallback
    Var {
        path: Vec<String>,
        default: Option<Box<Expr>>,
    },
    /// Operator application
    Op(Operator, Vec<Expr>),
}

impl Expr {
    /// Parse a JSON logic document into an expression tree
    pub fn parse(value: &Value) -> LogicResult<Self> {
        match value {
            Value::Array(items) => Ok(Expr::List(
                items.iter().map(Expr::parse).collect::<LogicResult<_>>()?,
            )),
            Value::Object(map) => {
                if map.len() != 1 {
                    return Err(LogicError::MalformedExpression(format!(
                        "operator node must have exactly one key, found {}",
                        map.len()
                    )));
                }
                let (name, args) = map.iter().next().ok_or_else(|| {
                    LogicError::MalformedExpression("empty operator node".into())
                })?;
                if name == "var" {
                    return parse_var(args);
                }
                let op = Operator::from_name(name)
                    .ok_or_else(|| LogicError::UnknownOperator(name.clone()))?;
                let args = operator_args(args);
                op.arity().check(op, args.len())?;
                Ok(Expr::Op(
                    op,
                    args.into_iter().map(Expr::parse).collect::<LogicResult<_>>()?,
                ))
            }
            scalar => Ok(Expr::Literal(scalar.clone())),
        }
    }

    pub fn var(path: &str) -> Self {
        Expr::Var {
            path: split_path(path),
            default: None,
        }
    }

    /// Root operator, if this node is an operator application
    pub fn operator(&self) -> Option<Operator> {
        match self {
            Expr::Op(op, _) => Some(*op),
            _ => None,
        }
    }

    /// Non-negative integer literal value, if this node is one
    pub fn as_action_literal(&self) -> Option<i64> {
        match self {
            Expr::Literal(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .filter(|v| *v >= 0),
            _ => None,
        }
    }
}

/// Operator arguments: an array is the argument list, anything else is a
/// single argument (`{"!": true}` is `{"!": [true]}`).
fn operator_args(args: &Value) -> Vec<&Value> {
    match args {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn parse_var(args: &Value) -> LogicResult<Expr> {
    let (path, default) = match args {
        Value::Array(items) => match items.as_slice() {
            [] => (Value::String(String::new()), None),
            [path] => (path.clone(), None),
            [path, default] => (path.clone(), Some(Box::new(Expr::parse(default)?))),
            _ => {
                return Err(LogicError::InvalidArity {
                    operator: "var".into(),
                    expected: Arity::Between(0, 2).to_string(),
                    found: items.len(),
                })
            }
        },
        other => (other.clone(), None),
    };

    let path = match path {
        Value::String(s) => split_path(&s),
        Value::Number(n) => vec![n.to_string()],
        Value::Null => Vec::new(),
        other => {
            return Err(LogicError::MalformedExpression(format!(
                "var path must be a string or number, found {}",
                other
            )))
        }
    };

    Ok(Expr::Var { path, default })
}

pub(crate) fn split_path(path: &str) -> Vec<String> {
    if path.is_empty() {
        return Vec::new();
    }
    path.split('.').map(str::to_string).collect()
}

// ── Authoring-time validation ────────────────────────────────────────

/// Check an expression without evaluating it.
///
/// Unlike [`Expr::parse`], which stops at the first problem, this walks
/// the whole document and reports every unknown operator, arity mismatch
/// and malformed node, each prefixed with its location.
pub fn validate_expression(expression: &Value) -> Vec<String> {
    let mut problems = Vec::new();
    if expression.is_null() {
        problems.push(LogicError::InvalidArgument("expression").to_string());
        return problems;
    }
    collect_problems(expression, "", &mut problems);
    problems
}

fn collect_problems(value: &Value, at: &str, problems: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_problems(item, &format!("{}/{}", at, i), problems);
            }
        }
        Value::Object(map) => {
            if map.len() != 1 {
                problems.push(format!(
                    "{}: operator node must have exactly one key, found {}",
                    location(at),
                    map.len()
                ));
                return;
            }
            let Some((name, args)) = map.iter().next() else {
                return;
            };
            let here = format!("{}/{}", at, name);
            if name == "var" {
                if let Err(e) = parse_var(args) {
                    problems.push(format!("{}: {}", here, e));
                }
                return;
            }
            let Some(op) = Operator::from_name(name) else {
                problems.push(format!("{}: {}", location(at), LogicError::UnknownOperator(name.clone())));
                return;
            };
            let args = operator_args(args);
            if let Err(e) = op.arity().check(op, args.len()) {
                problems.push(format!("{}: {}", here, e));
            }
            for (i, arg) in args.iter().enumerate() {
                collect_problems(arg, &format!("{}/{}", here, i), problems);
            }
        }
        _ => {}
    }
}

fn location(at: &str) -> &str {
    if at.is_empty() {
        "/"
    } else {
        at
    }
}
