//! Property tests for disclosure and routing invariants.

use blueprint_engine::{apply_disclosure, RoutingEngine};
use blueprint_types::{Action, Blueprint, DataMap, Disclosure, Route};
use proptest::prelude::*;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_record() -> impl Strategy<Value = DataMap> {
    prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..12).prop_map(|m| {
        m.into_iter()
            .map(|(k, v)| (k, json!(v)))
            .collect::<DataMap>()
    })
}

fn arb_pointers() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![
            "[a-z]{1,8}".prop_map(|f| format!("/{}", f)),
            "[a-z]{1,8}".prop_map(|f| format!("#/{}", f)),
            Just("  ".to_string()),
        ],
        0..8,
    )
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// A disclosure never contains a field its pointers did not name.
    #[test]
    fn disclosure_never_leaks_unnamed_fields(record in arb_record(), pointers in arb_pointers()) {
        let named: Vec<String> = pointers
            .iter()
            .map(|p| p.trim().trim_start_matches('#').trim_start_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();

        let out = apply_disclosure(&record, &Disclosure::new("p", pointers.clone()));

        for (key, value) in &out {
            prop_assert!(named.contains(key));
            prop_assert_eq!(Some(value), record.get(key));
        }
        for field in &named {
            prop_assert_eq!(out.contains_key(field), record.contains_key(field));
        }
    }

    /// Completion and a populated branch list are mutually exclusive.
    #[test]
    fn routing_completion_excludes_next_actions(
        threshold in -1000i64..1000,
        amount in -1000i64..1000,
        targets in prop::collection::vec(0i32..4, 0..4),
    ) {
        let blueprint = Blueprint::new("p")
            .with_action(Action::new(0, "a", "p0"))
            .with_action(Action::new(1, "b", "p1"))
            .with_action(Action::new(2, "c", "p2"))
            .with_action(Action::new(3, "d", "p3"));
        let action = Action::new(0, "a", "p0")
            .with_route(Route::when("gt", json!({">": [{"var": "amount"}, threshold]}), targets.clone()))
            .with_route(Route::default_route("else", vec![]));

        let mut data = DataMap::new();
        data.insert("amount".into(), Value::from(amount));
        let routing = RoutingEngine::default().determine_next(&blueprint, &action, &data).unwrap();

        prop_assert_ne!(routing.is_workflow_complete, !routing.next_actions.is_empty());
        prop_assert_eq!(routing.is_parallel, routing.next_actions.len() > 1);
        if let Some(first) = routing.next_actions.first() {
            prop_assert_eq!(routing.next_action_id, Some(first.action_id));
        }
    }
}
