//! End-to-end evaluation scenarios: approval tiers, tax calculations and
//! content-keyed caching through the public API.

use blueprint_logic::{validate_expression, ExpressionCache, LogicError, LogicEvaluator};
use blueprint_types::{Condition, DataMap};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

fn approval_tier() -> Value {
    json!({"if": [
        {">": [{"var": "amount"}, 10000]}, "director",
        {">": [{"var": "amount"}, 5000]}, "manager",
        "auto-approve"
    ]})
}

fn data(value: Value) -> DataMap {
    value.as_object().cloned().unwrap_or_default()
}

#[test]
fn approval_tiers_follow_the_cascade() {
    let evaluator = LogicEvaluator::new();
    let expr = approval_tier();

    for (amount, expected) in [(15000, "director"), (7500, "manager"), (2000, "auto-approve")] {
        let tier = evaluator.evaluate(&expr, &json!({ "amount": amount })).unwrap();
        assert_eq!(tier, json!(expected), "amount {}", amount);
    }
}

#[test]
fn tax_calculation_sees_previous_result() {
    let evaluator = LogicEvaluator::new();
    let calculations = data(json!({
        "taxAmount": {"*": [{"var": "basePrice"}, {"var": "taxRate"}]},
        "total": {"+": [{"var": "basePrice"}, {"var": "taxAmount"}]}
    }));

    let out = evaluator
        .apply_calculations(&data(json!({"basePrice": 100, "taxRate": 0.1})), &calculations)
        .unwrap();

    assert_eq!(out.get("taxAmount"), Some(&json!(10.0)));
    assert_eq!(out.get("total"), Some(&json!(110.0)));
}

#[test]
fn reversed_calculation_order_does_not_infer_dependencies() {
    let evaluator = LogicEvaluator::new();
    // `total` runs first and cannot see `taxAmount` yet.
    let calculations = data(json!({
        "total": {"+": [{"var": "basePrice"}, {"var": "taxAmount"}]},
        "taxAmount": {"*": [{"var": "basePrice"}, {"var": "taxRate"}]}
    }));

    let out = evaluator
        .apply_calculations(&data(json!({"basePrice": 100, "taxRate": 0.1})), &calculations)
        .unwrap();

    assert_eq!(out.get("total"), Some(&json!(100.0)));
    assert_eq!(out.get("taxAmount"), Some(&json!(10.0)));
}

#[test]
fn legacy_conditions_pick_first_full_match() {
    let evaluator = LogicEvaluator::new();
    let conditions = vec![
        Condition::new("legal", vec![json!({"==": [{"var": "contract.type"}, "nda"]})]),
        Condition::new("finance", vec![json!(true)]),
    ];

    let nda = json!({"contract": {"type": "nda"}});
    let other = json!({"contract": {"type": "msa"}});
    assert_eq!(evaluator.evaluate_conditions(&nda, &conditions).unwrap().as_deref(), Some("legal"));
    assert_eq!(evaluator.evaluate_conditions(&other, &conditions).unwrap().as_deref(), Some("finance"));
    assert!(matches!(
        evaluator.evaluate_conditions(&Value::Null, &conditions),
        Err(LogicError::InvalidArgument(_))
    ));
}

#[test]
fn identical_content_shares_one_cache_entry() {
    let cache: ExpressionCache<String> = ExpressionCache::new();
    let first: Value = serde_json::from_str(r#"{"and":[{"var":"a"},{"var":"b"}]}"#).unwrap();
    let second: Value = serde_json::from_str(r#"{ "and" : [ {"var":"a"}, {"var":"b"} ] }"#).unwrap();

    let invoked = AtomicUsize::new(0);
    let a = cache.get_or_add(&first, || "compiled".to_string());
    let b = cache.get_or_add(&second, || {
        invoked.fetch_add(1, Ordering::SeqCst);
        "recompiled".to_string()
    });

    assert_eq!(a, b);
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
}

#[test]
fn concurrent_evaluation_shares_compiled_tree() {
    const THREADS: usize = 16;
    let cache = Arc::new(blueprint_logic::CompiledCache::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let evaluator = LogicEvaluator::with_cache(Arc::clone(&cache));
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                evaluator
                    .evaluate(&approval_tier(), &json!({ "amount": i * 1000 }))
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        let tier = handle.join().unwrap();
        assert!(tier.is_string());
    }
    assert_eq!(cache.len(), 1);
}

#[test]
fn authoring_validation_lists_all_problems() {
    let problems = validate_expression(&json!({
        "or": [{"lol": [1]}, {"!": [1, 2]}, {"var": "ok"}]
    }));
    assert_eq!(problems.len(), 2);
    assert!(validate_expression(&approval_tier()).is_empty());
}
