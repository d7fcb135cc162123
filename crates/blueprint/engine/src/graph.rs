//! Static workflow graph validation
//!
//! Each action's top-level `condition` names the action(s) that may follow
//! it: a bare non-negative integer, or an `if` whose branch values are
//! integers (or further `if` nodes). A condition rooted at any other
//! operator is terminal, conventionally `{"==": [0, 0]}`.
//!
//! The checks are independent. A blueprint is well-formed only when all of
//! them report nothing.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use blueprint_logic::{validate_expression, Expr, LogicEvaluator, Operator};
use blueprint_types::{ActionId, Blueprint};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// One well-formedness problem in a blueprint's action graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphIssue {
    #[error("Action 0 (entry point) is missing")]
    MissingEntryAction,

    #[error("Duplicate action id {0}")]
    DuplicateActionId(ActionId),

    #[error("Negative action id {0}")]
    NegativeActionId(ActionId),

    #[error("Action {from} routes to non-existent action {target}")]
    UnknownTarget { from: ActionId, target: ActionId },

    #[error("Route '{route_id}' of action {from} targets non-existent action {target}")]
    UnknownRouteTarget {
        from: ActionId,
        route_id: String,
        target: ActionId,
    },

    #[error("Action {action_id} has {count} default routes")]
    MultipleDefaultRoutes { action_id: ActionId, count: usize },

    #[error("Action {0} is unreachable from action 0")]
    Unreachable(ActionId),

    #[error("Cycle detected: {}", join_path(.path))]
    Cycle { path: Vec<ActionId> },

    #[error("Action {action_id} condition is malformed: {problem}")]
    MalformedCondition { action_id: ActionId, problem: String },
}

fn join_path(path: &[ActionId]) -> String {
    path.iter()
        .map(ActionId::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Everything [`GraphValidator::validate`] found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphValidationReport {
    pub errors: Vec<GraphIssue>,
}

impl GraphValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Human-readable messages, one per issue
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Authoring-time checks over a blueprint's action graph
#[derive(Clone, Debug, Default)]
pub struct GraphValidator {
    evaluator: LogicEvaluator,
}

impl GraphValidator {
    pub fn new(evaluator: LogicEvaluator) -> Self {
        Self { evaluator }
    }

    /// Run every check and collect all issues
    pub fn validate(&self, blueprint: &Blueprint) -> GraphValidationReport {
        let mut errors = Vec::new();
        errors.extend(self.validate_action_sequence(blueprint));
        errors.extend(self.validate_conditions(blueprint));
        errors.extend(self.validate_routing_targets(blueprint));
        errors.extend(self.validate_route_tables(blueprint));
        errors.extend(self.validate_workflow_reachability(blueprint));
        errors.extend(self.detect_cycles(blueprint));

        if errors.is_empty() {
            debug!(blueprint_id = %blueprint.id, "Blueprint graph is well-formed");
        } else {
            warn!(
                blueprint_id = %blueprint.id,
                issues = errors.len(),
                "Blueprint graph validation failed"
            );
        }
        GraphValidationReport { errors }
    }

    /// Possible next action ids encoded in a condition.
    ///
    /// Malformed conditions yield no targets; [`validate_conditions`]
    /// reports them.
    ///
    /// [`validate_conditions`]: Self::validate_conditions
    pub fn extract_condition_targets(&self, condition: &Value) -> Vec<ActionId> {
        match self.evaluator.compile(condition) {
            Ok(expr) => {
                let mut targets = Vec::new();
                collect_targets(&expr, &mut targets);
                targets
            }
            Err(_) => Vec::new(),
        }
    }

    /// Action 0 exists, ids are unique, ids are non-negative
    pub fn validate_action_sequence(&self, blueprint: &Blueprint) -> Vec<GraphIssue> {
        let mut issues = Vec::new();

        if !blueprint.actions.iter().any(|a| a.id == 0) {
            issues.push(GraphIssue::MissingEntryAction);
        }

        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        for action in &blueprint.actions {
            if !seen.insert(action.id) && reported.insert(action.id) {
                issues.push(GraphIssue::DuplicateActionId(action.id));
            }
        }

        for action in blueprint.actions.iter().filter(|a| a.id < 0) {
            issues.push(GraphIssue::NegativeActionId(action.id));
        }

        issues
    }

    /// Every action condition parses
    pub fn validate_conditions(&self, blueprint: &Blueprint) -> Vec<GraphIssue> {
        blueprint
            .actions
            .iter()
            .filter_map(|action| action.condition.as_ref().map(|c| (action.id, c)))
            .filter(|(_, condition)| !condition.is_null())
            .flat_map(|(action_id, condition)| {
                validate_expression(condition)
                    .into_iter()
                    .map(move |problem| GraphIssue::MalformedCondition { action_id, problem })
            })
            .collect()
    }

    /// Every condition target names an existing action
    pub fn validate_routing_targets(&self, blueprint: &Blueprint) -> Vec<GraphIssue> {
        let ids = action_ids(blueprint);
        let mut issues = Vec::new();
        for action in &blueprint.actions {
            for target in self.targets_of(action.condition.as_ref()) {
                if !ids.contains(&target) {
                    issues.push(GraphIssue::UnknownTarget {
                        from: action.id,
                        target,
                    });
                }
            }
        }
        issues
    }

    /// Route tables name existing actions and have at most one default
    pub fn validate_route_tables(&self, blueprint: &Blueprint) -> Vec<GraphIssue> {
        let ids = action_ids(blueprint);
        let mut issues = Vec::new();
        for action in &blueprint.actions {
            let defaults = action.routes.iter().filter(|r| r.is_default).count();
            if defaults > 1 {
                issues.push(GraphIssue::MultipleDefaultRoutes {
                    action_id: action.id,
                    count: defaults,
                });
            }
            for route in &action.routes {
                for target in route.next_action_ids.iter().filter(|t| !ids.contains(t)) {
                    issues.push(GraphIssue::UnknownRouteTarget {
                        from: action.id,
                        route_id: route.id.clone(),
                        target: *target,
                    });
                }
            }
        }
        issues
    }

    /// Breadth-first walk from action 0; anything not reached is reported
    pub fn validate_workflow_reachability(&self, blueprint: &Blueprint) -> Vec<GraphIssue> {
        let graph = self.successors(blueprint);
        let mut reached = HashSet::new();

        if graph.contains_key(&0) {
            let mut queue = VecDeque::from([0]);
            reached.insert(0);
            while let Some(current) = queue.pop_front() {
                for next in graph.get(&current).into_iter().flatten() {
                    if graph.contains_key(next) && reached.insert(*next) {
                        queue.push_back(*next);
                    }
                }
            }
        }

        let mut unreachable: BTreeSet<ActionId> = BTreeSet::new();
        for action in &blueprint.actions {
            if !reached.contains(&action.id) {
                unreachable.insert(action.id);
            }
        }
        unreachable.into_iter().map(GraphIssue::Unreachable).collect()
    }

    /// Depth-first search with a recursion stack; each back edge is one
    /// reported cycle, including self-loops.
    pub fn detect_cycles(&self, blueprint: &Blueprint) -> Vec<GraphIssue> {
        let graph = self.successors(blueprint);
        let mut roots: Vec<ActionId> = graph.keys().copied().collect();
        roots.sort_unstable();

        let mut visited = HashSet::new();
        let mut cycles = Vec::new();
        for root in roots {
            if !visited.contains(&root) {
                let mut stack = Vec::new();
                visit(root, &graph, &mut visited, &mut stack, &mut cycles);
            }
        }

        for cycle in &cycles {
            if let GraphIssue::Cycle { path } = cycle {
                debug!(path = %join_path(path), "Cycle detected");
            }
        }
        cycles
    }

    fn targets_of(&self, condition: Option<&Value>) -> Vec<ActionId> {
        match condition {
            Some(c) if !c.is_null() => self.extract_condition_targets(c),
            _ => Vec::new(),
        }
    }

    // Adjacency by action id; the first declaration of a duplicated id wins.
    fn successors(&self, blueprint: &Blueprint) -> HashMap<ActionId, Vec<ActionId>> {
        let mut graph = HashMap::new();
        for action in &blueprint.actions {
            graph
                .entry(action.id)
                .or_insert_with(|| self.targets_of(action.condition.as_ref()));
        }
        graph
    }
}

fn action_ids(blueprint: &Blueprint) -> HashSet<ActionId> {
    blueprint.actions.iter().map(|a| a.id).collect()
}

fn collect_targets(expr: &Expr, targets: &mut Vec<ActionId>) {
    match expr {
        Expr::Op(Operator::If, args) => {
            // Branch values sit at odd positions, plus a trailing default.
            for (i, arg) in args.iter().enumerate() {
                let is_value = i % 2 == 1 || (i == args.len() - 1 && args.len() > 1);
                if is_value {
                    collect_targets(arg, targets);
                }
            }
        }
        other => {
            if let Some(id) = other.as_action_literal().and_then(|n| ActionId::try_from(n).ok()) {
                if !targets.contains(&id) {
                    targets.push(id);
                }
            }
        }
    }
}

fn visit(
    node: ActionId,
    graph: &HashMap<ActionId, Vec<ActionId>>,
    visited: &mut HashSet<ActionId>,
    stack: &mut Vec<ActionId>,
    cycles: &mut Vec<GraphIssue>,
) {
    visited.insert(node);
    stack.push(node);

    for next in graph.get(&node).into_iter().flatten() {
        if let Some(pos) = stack.iter().position(|n| n == next) {
            let mut path = stack[pos..].to_vec();
            path.push(*next);
            cycles.push(GraphIssue::Cycle { path });
        } else if !visited.contains(next) && graph.contains_key(next) {
            visit(*next, graph, visited, stack, cycles);
        }
    }

    stack.pop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_types::{Action, Route};
    use serde_json::json;

    fn step(id: ActionId, condition: Value) -> Action {
        Action::new(id, format!("Step {}", id), "p").with_condition(condition)
    }

    fn terminal() -> Value {
        json!({"==": [0, 0]})
    }

    fn validator() -> GraphValidator {
        GraphValidator::new(LogicEvaluator::uncached())
    }

    #[test]
    fn test_extract_targets() {
        let v = validator();
        assert_eq!(v.extract_condition_targets(&json!(2)), vec![2]);
        assert_eq!(
            v.extract_condition_targets(&json!({"if": [{"var": "ok"}, 1, 2]})),
            vec![1, 2]
        );
        assert!(v.extract_condition_targets(&terminal()).is_empty());
        assert!(v.extract_condition_targets(&json!({"and": [true, 3]})).is_empty());
        assert!(v.extract_condition_targets(&json!(-1)).is_empty());
        assert!(v.extract_condition_targets(&json!("3")).is_empty());
    }

    #[test]
    fn test_extract_targets_nested_and_cascading_if() {
        let v = validator();
        let nested = json!({"if": [
            {"var": "a"}, 1,
            {"if": [{"var": "b"}, 2, 3]}
        ]});
        assert_eq!(v.extract_condition_targets(&nested), vec![1, 2, 3]);

        let cascade = json!({"if": [{"var": "a"}, 4, {"var": "b"}, 5, 6]});
        assert_eq!(v.extract_condition_targets(&cascade), vec![4, 5, 6]);
    }

    #[test]
    fn test_action_sequence_issues_are_distinct() {
        let v = validator();

        let no_entry = Blueprint::new("t").with_action(step(1, terminal()));
        assert_eq!(v.validate_action_sequence(&no_entry), vec![GraphIssue::MissingEntryAction]);

        let dup = Blueprint::new("t")
            .with_action(step(0, json!(1)))
            .with_action(step(1, terminal()))
            .with_action(step(1, terminal()));
        assert_eq!(v.validate_action_sequence(&dup), vec![GraphIssue::DuplicateActionId(1)]);

        let negative = Blueprint::new("t")
            .with_action(step(0, terminal()))
            .with_action(step(-2, terminal()));
        assert_eq!(v.validate_action_sequence(&negative), vec![GraphIssue::NegativeActionId(-2)]);
    }

    #[test]
    fn test_unknown_condition_target() {
        let bp = Blueprint::new("t").with_action(step(0, json!({"if": [true, 1, 9]}))).with_action(step(1, terminal()));
        assert_eq!(
            validator().validate_routing_targets(&bp),
            vec![GraphIssue::UnknownTarget { from: 0, target: 9 }]
        );
    }

    #[test]
    fn test_route_table_checks() {
        let mut start = step(0, json!(1));
        start.routes = vec![
            Route::default_route("a", vec![1]),
            Route::default_route("b", vec![7]),
        ];
        let bp = Blueprint::new("t").with_action(start).with_action(step(1, terminal()));
        let issues = validator().validate_route_tables(&bp);
        assert!(issues.contains(&GraphIssue::MultipleDefaultRoutes { action_id: 0, count: 2 }));
        assert!(issues.contains(&GraphIssue::UnknownRouteTarget {
            from: 0,
            route_id: "b".into(),
            target: 7,
        }));
    }

    #[test]
    fn test_unreachable_action() {
        let bp = Blueprint::new("t")
            .with_action(step(0, json!(1)))
            .with_action(step(1, terminal()))
            .with_action(step(2, terminal()));
        assert_eq!(
            validator().validate_workflow_reachability(&bp),
            vec![GraphIssue::Unreachable(2)]
        );
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let bp = Blueprint::new("t").with_action(step(0, json!({"if": [{"var": "again"}, 0, 1]}))).with_action(step(1, terminal()));
        assert_eq!(
            validator().detect_cycles(&bp),
            vec![GraphIssue::Cycle { path: vec![0, 0] }]
        );
    }

    #[test]
    fn test_malformed_condition_reported() {
        let bp = Blueprint::new("t").with_action(step(0, json!({"whatever": [1]})));
        let issues = validator().validate_conditions(&bp);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].to_string().contains("Unknown operator"));
    }

    #[test]
    fn test_cycle_display() {
        let issue = GraphIssue::Cycle { path: vec![0, 1, 0] };
        assert_eq!(issue.to_string(), "Cycle detected: 0 -> 1 -> 0");
    }
}
