//! Property tests for evaluator and cache invariants.

use blueprint_logic::{ExpressionKey, LogicEvaluator};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1_000_000i64..1_000_000).prop_map(|n| json!(n)),
        "[a-z]{0,8}".prop_map(Value::String),
    ]
}

/// Small JSON objects with distinct keys
fn arb_object() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::btree_map("[a-z]{1,6}", arb_scalar(), 1..8)
        .prop_map(|m| m.into_iter().collect())
}

fn arb_operand() -> impl Strategy<Value = Value> {
    prop_oneof![
        (-10_000i64..10_000).prop_map(|n| json!(n)),
        (-1000.0f64..1000.0).prop_map(|f| json!(f)),
    ]
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// Key order inside an object never changes its cache key.
    #[test]
    fn cache_key_ignores_key_order(entries in arb_object()) {
        let forward: Map<String, Value> = entries.iter().cloned().collect();
        let backward: Map<String, Value> = entries.iter().rev().cloned().collect();
        prop_assert_eq!(
            ExpressionKey::of(&Value::Object(forward)),
            ExpressionKey::of(&Value::Object(backward))
        );
    }

    /// Arithmetic on numeric operands always yields a float or null.
    #[test]
    fn arithmetic_never_yields_integers(
        op in prop_oneof![Just("+"), Just("-"), Just("*"), Just("/"), Just("%")],
        a in arb_operand(),
        b in arb_operand(),
    ) {
        let expr = json!({ op: [a, b] });
        let result = LogicEvaluator::uncached().evaluate(&expr, &json!({})).unwrap();
        prop_assert!(result.is_f64() || result.is_null(), "{} gave {}", expr, result);
    }

    /// Comparisons always yield booleans, whatever the operands.
    #[test]
    fn comparisons_yield_booleans(
        op in prop_oneof![Just("=="), Just("!="), Just("<"), Just("<="), Just(">"), Just(">=")],
        a in arb_scalar(),
        b in arb_scalar(),
    ) {
        let expr = json!({ op: [a, b] });
        let result = LogicEvaluator::uncached().evaluate(&expr, &json!({})).unwrap();
        prop_assert!(result.is_boolean());
    }

    /// `var` returns exactly the stored value for every present key.
    #[test]
    fn var_reads_back_present_fields(entries in arb_object()) {
        let data = Value::Object(entries.iter().cloned().collect());
        let evaluator = LogicEvaluator::uncached();
        for (key, value) in &entries {
            let got = evaluator.evaluate(&json!({"var": key}), &data).unwrap();
            prop_assert_eq!(&got, value);
        }
    }
}
