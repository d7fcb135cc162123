//! Tree-walking evaluator over compiled [`Expr`] trees
//!
//! [`LogicEvaluator`] compiles JSON logic documents once (through the
//! process-wide [`ExpressionCache`] unless built uncached) and walks the
//! resulting tree against a data document. Evaluation is synchronous and
//! side-effect free.

use crate::cache::ExpressionCache;
use crate::error::{LogicError, LogicResult};
use crate::expr::{Expr, Operator};
use crate::value::{compare, from_number, is_truthy, loose_equals, lookup, to_display_string, to_number};
use blueprint_types::{is_always_criterion, Blueprint, Condition, DataMap, Participant};
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace, warn};

/// Cache of compiled expression trees
pub type CompiledCache = ExpressionCache<Arc<Expr>>;

static SHARED_CACHE: OnceLock<Arc<CompiledCache>> = OnceLock::new();

/// The process-wide compiled-expression cache
pub fn shared_cache() -> Arc<CompiledCache> {
    Arc::clone(SHARED_CACHE.get_or_init(|| Arc::new(CompiledCache::new())))
}

/// Outcome of running every calculation of an action without stopping
/// at the first failure
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CalculationOutcome {
    /// Successfully calculated fields, in declaration order
    pub values: DataMap,
    /// One entry per calculation that failed; failed fields are absent
    /// from `values`
    pub failures: Vec<LogicError>,
}

/// JSON logic evaluator
#[derive(Clone, Debug)]
pub struct LogicEvaluator {
    cache: Option<Arc<CompiledCache>>,
}

impl LogicEvaluator {
    /// Evaluator backed by the process-wide cache
    pub fn new() -> Self {
        Self {
            cache: Some(shared_cache()),
        }
    }

    /// Evaluator that re-parses every expression
    pub fn uncached() -> Self {
        Self { cache: None }
    }

    /// Evaluator backed by a caller-owned cache
    pub fn with_cache(cache: Arc<CompiledCache>) -> Self {
        Self { cache: Some(cache) }
    }

    pub fn cache(&self) -> Option<&Arc<CompiledCache>> {
        self.cache.as_ref()
    }

    /// Parse an expression, reusing a cached tree for identical content
    pub fn compile(&self, expression: &Value) -> LogicResult<Arc<Expr>> {
        if expression.is_null() {
            return Err(LogicError::InvalidArgument("expression"));
        }
        match &self.cache {
            Some(cache) => {
                cache.get_or_try_add(expression, || Expr::parse(expression).map(Arc::new))
            }
            None => Expr::parse(expression).map(Arc::new),
        }
    }

    /// Evaluate `expression` against `data`
    pub fn evaluate(&self, expression: &Value, data: &Value) -> LogicResult<Value> {
        if data.is_null() {
            return Err(LogicError::InvalidArgument("data"));
        }
        let compiled = self.compile(expression)?;
        Ok(eval(&compiled, data))
    }

    /// Evaluate `expression` and coerce the result to a boolean
    pub fn is_satisfied(&self, expression: &Value, data: &Value) -> LogicResult<bool> {
        self.evaluate(expression, data).map(|v| is_truthy(&v))
    }

    /// Fold `calculations` over `data` in declaration order and return the
    /// merged data set. Each result is visible to the calculations after it.
    pub fn apply_calculations(&self, data: &DataMap, calculations: &DataMap) -> LogicResult<DataMap> {
        let mut working = Value::Object(data.clone());
        for (name, expression) in calculations {
            let value = self
                .evaluate(expression, &working)
                .map_err(|e| LogicError::Calculation {
                    name: name.clone(),
                    source: Box::new(e),
                })?;
            trace!(field = %name, value = %value, "Calculated");
            if let Value::Object(map) = &mut working {
                map.insert(name.clone(), value);
            }
        }
        match working {
            Value::Object(map) => Ok(map),
            _ => Ok(DataMap::new()),
        }
    }

    /// Like [`apply_calculations`](Self::apply_calculations) but returns
    /// only the calculated fields and keeps going past failures.
    pub fn calculate(&self, data: &DataMap, calculations: &DataMap) -> CalculationOutcome {
        let mut working = Value::Object(data.clone());
        let mut outcome = CalculationOutcome::default();

        for (name, expression) in calculations {
            match self.evaluate(expression, &working) {
                Ok(value) => {
                    if let Value::Object(map) = &mut working {
                        map.insert(name.clone(), value.clone());
                    }
                    outcome.values.insert(name.clone(), value);
                }
                Err(e) => {
                    debug!(field = %name, error = %e, "Calculation failed");
                    outcome.failures.push(LogicError::Calculation {
                        name: name.clone(),
                        source: Box::new(e),
                    });
                }
            }
        }

        outcome
    }

    /// Whether every criterion of `condition` holds for `data`
    pub fn condition_matches(&self, condition: &Condition, data: &Value) -> LogicResult<bool> {
        if condition.is_unconditional() {
            return Ok(true);
        }
        for criterion in &condition.criteria {
            if is_always_criterion(criterion) {
                continue;
            }
            if !self.is_satisfied(criterion, data)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// First-match-wins scan of a legacy condition list. Returns the
    /// participant id of the first condition whose criteria all hold.
    pub fn evaluate_conditions(
        &self,
        data: &Value,
        conditions: &[Condition],
    ) -> LogicResult<Option<String>> {
        if data.is_null() {
            return Err(LogicError::InvalidArgument("data"));
        }
        for condition in conditions {
            if self.condition_matches(condition, data)? {
                debug!(participant = %condition.participant_id, "Condition matched");
                return Ok(Some(condition.participant_id.clone()));
            }
        }
        Ok(None)
    }

    /// First participant of `blueprint` whose own routing conditions all
    /// hold for `data`. A condition that fails to evaluate counts as a
    /// non-match.
    pub fn select_participant<'a>(
        &self,
        blueprint: &'a Blueprint,
        data: &DataMap,
    ) -> Option<&'a Participant> {
        blueprint.select_participant(data, |condition, data| {
            let scope = Value::Object(data.clone());
            self.condition_matches(condition, &scope).unwrap_or_else(|e| {
                warn!(participant = %condition.participant_id, error = %e, "Participant condition failed");
                false
            })
        })
    }
}

impl Default for LogicEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tree walk ────────────────────────────────────────────────────────

/// Evaluate a compiled tree. Evaluation never fails: a missing operand,
/// possible only in a hand-built tree, reads as `null`.
pub fn eval(expr: &Expr, data: &Value) -> Value {
    match expr {
        Expr::Literal(value) => value.clone(),
        Expr::List(items) => Value::Array(items.iter().map(|e| eval(e, data)).collect()),
        Expr::Var { path, default } => match lookup(data, path) {
            Some(found) if !found.is_null() => found.clone(),
            _ => default.as_ref().map(|d| eval(d, data)).unwrap_or(Value::Null),
        },
        Expr::Op(op, args) => apply(*op, args, data),
    }
}

fn apply(op: Operator, args: &[Expr], data: &Value) -> Value {
    match op {
        Operator::Eq => Value::Bool(loose_equals(&operand(args, 0, data), &operand(args, 1, data))),
        Operator::NotEq => Value::Bool(!loose_equals(&operand(args, 0, data), &operand(args, 1, data))),
        Operator::Lt => ordered(args, data, |o| o == Ordering::Less),
        Operator::Le => ordered(args, data, |o| o != Ordering::Greater),
        Operator::Gt => ordered(args, data, |o| o == Ordering::Greater),
        Operator::Ge => ordered(args, data, |o| o != Ordering::Less),
        Operator::And => Value::Bool(args.iter().all(|a| is_truthy(&eval(a, data)))),
        Operator::Or => Value::Bool(args.iter().any(|a| is_truthy(&eval(a, data)))),
        Operator::Not => Value::Bool(!is_truthy(&operand(args, 0, data))),
        Operator::Add => from_number(numbers(args, data).sum()),
        Operator::Mul => from_number(numbers(args, data).product()),
        Operator::Sub => {
            let first = to_number(&operand(args, 0, data));
            match args.get(1) {
                Some(rhs) => from_number(first - to_number(&eval(rhs, data))),
                None => from_number(-first),
            }
        }
        Operator::Div => from_number(
            to_number(&operand(args, 0, data)) / to_number(&operand(args, 1, data)),
        ),
        Operator::Mod => from_number(
            to_number(&operand(args, 0, data)) % to_number(&operand(args, 1, data)),
        ),
        Operator::If => {
            let mut pairs = args.chunks_exact(2);
            for pair in pairs.by_ref() {
                if is_truthy(&eval(&pair[0], data)) {
                    return eval(&pair[1], data);
                }
            }
            pairs
                .remainder()
                .first()
                .map(|fallback| eval(fallback, data))
                .unwrap_or(Value::Null)
        }
        Operator::Cat => Value::String(
            args.iter()
                .map(|a| to_display_string(&eval(a, data)))
                .collect(),
        ),
    }
}

fn ordered(args: &[Expr], data: &Value, test: impl Fn(Ordering) -> bool) -> Value {
    let lhs = operand(args, 0, data);
    let rhs = operand(args, 1, data);
    Value::Bool(compare(&lhs, &rhs).map(test).unwrap_or(false))
}

fn operand(args: &[Expr], index: usize, data: &Value) -> Value {
    args.get(index).map(|a| eval(a, data)).unwrap_or(Value::Null)
}

fn numbers<'a>(args: &'a [Expr], data: &'a Value) -> impl Iterator<Item = f64> + 'a {
    args.iter().map(move |a| to_number(&eval(a, data)))
}
