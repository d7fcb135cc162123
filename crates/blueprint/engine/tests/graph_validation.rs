//! Authoring-time graph validation over complete blueprints.

use blueprint_engine::{GraphIssue, GraphValidator};
use blueprint_types::{Action, ActionId, Blueprint};
use serde_json::{json, Value};

fn step(id: ActionId, condition: Value) -> Action {
    Action::new(id, format!("Step {}", id), format!("participant-{}", id)).with_condition(condition)
}

fn end() -> Value {
    json!({"==": [0, 0]})
}

#[test]
fn linear_chain_is_well_formed() {
    let bp = Blueprint::new("linear")
        .with_action(step(0, json!(1)))
        .with_action(step(1, json!(2)))
        .with_action(step(2, end()));

    let validator = GraphValidator::default();
    assert!(validator.detect_cycles(&bp).is_empty());
    assert!(validator.validate_workflow_reachability(&bp).is_empty());

    let report = validator.validate(&bp);
    assert!(report.is_valid(), "{:?}", report.messages());
}

#[test]
fn two_step_loop_is_reported_with_both_ids() {
    let bp = Blueprint::new("loop")
        .with_action(step(0, json!(1)))
        .with_action(step(1, json!(0)));

    let cycles = GraphValidator::default().detect_cycles(&bp);
    assert_eq!(cycles.len(), 1);
    match &cycles[0] {
        GraphIssue::Cycle { path } => {
            assert!(path.contains(&0));
            assert!(path.contains(&1));
        }
        other => panic!("unexpected issue {:?}", other),
    }
}

#[test]
fn branching_condition_reaches_both_arms() {
    let bp = Blueprint::new("branch")
        .with_action(step(0, json!({"if": [{">": [{"var": "amount"}, 1000]}, 2, 1]})))
        .with_action(step(1, json!(3)))
        .with_action(step(2, json!(3)))
        .with_action(step(3, end()));

    let report = GraphValidator::default().validate(&bp);
    assert!(report.is_valid(), "{:?}", report.messages());
}

#[test]
fn sequence_problems_are_distinct_errors() {
    let validator = GraphValidator::default();

    let missing_entry = Blueprint::new("a").with_action(step(1, end()));
    let duplicate = Blueprint::new("b")
        .with_action(step(0, json!(1)))
        .with_action(step(1, end()))
        .with_action(step(1, end()));
    let negative = Blueprint::new("c")
        .with_action(step(0, end()))
        .with_action(step(-1, end()));

    let a = validator.validate_action_sequence(&missing_entry);
    let b = validator.validate_action_sequence(&duplicate);
    let c = validator.validate_action_sequence(&negative);

    assert_eq!(a, vec![GraphIssue::MissingEntryAction]);
    assert_eq!(b, vec![GraphIssue::DuplicateActionId(1)]);
    assert_eq!(c, vec![GraphIssue::NegativeActionId(-1)]);
    assert_ne!(a[0].to_string(), b[0].to_string());
    assert_ne!(b[0].to_string(), c[0].to_string());
}

#[test]
fn composite_report_collects_everything() {
    let bp = Blueprint::new("broken")
        .with_action(step(0, json!({"if": [true, 5, 0]})))
        .with_action(step(1, json!({"bogus": []})))
        .with_action(step(2, end()));

    let report = GraphValidator::default().validate(&bp);
    assert!(!report.is_valid());

    let errors = &report.errors;
    assert!(errors.contains(&GraphIssue::UnknownTarget { from: 0, target: 5 }));
    assert!(errors.contains(&GraphIssue::Unreachable(1)));
    assert!(errors.contains(&GraphIssue::Unreachable(2)));
    assert!(errors.contains(&GraphIssue::Cycle { path: vec![0, 0] }));
    assert!(errors
        .iter()
        .any(|e| matches!(e, GraphIssue::MalformedCondition { action_id: 1, .. })));
}

#[test]
fn blueprint_json_round_trip_validates() {
    let json = r#"{
        "id": "bp-1",
        "title": "Loan",
        "participants": [{"id": "applicant", "name": "Applicant"}],
        "actions": [
            {"id": 0, "title": "Apply", "sender": "applicant", "condition": 1},
            {"id": 1, "title": "Decide", "sender": "bank", "condition": {"==": [0, 0]}}
        ]
    }"#;
    let bp = Blueprint::from_json(json).unwrap();
    assert!(GraphValidator::default().validate(&bp).is_valid());
}
