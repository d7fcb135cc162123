//! Routing engine: resolves the next step(s) of a workflow
//!
//! Two routing models coexist on an [`Action`]:
//!
//! 1. **Route table** (`routes` non-empty): conditional routes in
//!    declaration order, first match wins, then the default route. A route
//!    may fan out to several actions at once.
//! 2. **Legacy condition list** (`participants` non-empty): first
//!    participant whose criteria all hold; the next action is the first
//!    one that participant sends.
//!
//! The route table takes precedence. With neither, the workflow is
//! complete.

use blueprint_logic::LogicEvaluator;
use blueprint_types::{Action, ActionId, Blueprint, DataMap, Route, RoutedAction, RoutingResult};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::EngineResult;

/// Resolves where a workflow goes after an action
#[derive(Clone, Debug, Default)]
pub struct RoutingEngine {
    evaluator: LogicEvaluator,
}

impl RoutingEngine {
    pub fn new(evaluator: LogicEvaluator) -> Self {
        Self { evaluator }
    }

    /// Decide the next step(s) after `action`, given the post-calculation
    /// data.
    pub fn determine_next(
        &self,
        blueprint: &Blueprint,
        action: &Action,
        data: &DataMap,
    ) -> EngineResult<RoutingResult> {
        let scope = Value::Object(data.clone());

        let result = if action.has_routes() {
            self.route_table(blueprint, action, &scope)?
        } else if !action.participants.is_empty() {
            self.legacy_conditions(blueprint, action, &scope)?
        } else {
            debug!(action_id = action.id, "No routing defined");
            RoutingResult::complete()
        };

        debug!(
            blueprint_id = %blueprint.id,
            action_id = action.id,
            complete = result.is_workflow_complete,
            parallel = result.is_parallel,
            next = ?result.next_action_ids(),
            "Routing resolved"
        );
        Ok(result)
    }

    /// First non-default route whose condition holds, else the default
    /// route. A route without a condition always holds.
    pub fn select_route<'a>(&self, routes: &'a [Route], scope: &Value) -> EngineResult<Option<&'a Route>> {
        for route in routes.iter().filter(|r| !r.is_default) {
            let matched = match &route.condition {
                None | Some(Value::Null) => true,
                Some(condition) => self.evaluator.is_satisfied(condition, scope)?,
            };
            if matched {
                return Ok(Some(route));
            }
        }
        Ok(routes.iter().find(|r| r.is_default))
    }

    fn route_table(
        &self,
        blueprint: &Blueprint,
        action: &Action,
        scope: &Value,
    ) -> EngineResult<RoutingResult> {
        let Some(route) = self.select_route(&action.routes, scope)? else {
            debug!(action_id = action.id, "No route matched and no default route");
            return Ok(RoutingResult::complete());
        };

        let matched = route
            .condition
            .as_ref()
            .filter(|c| !c.is_null())
            .map(Value::to_string)
            .unwrap_or_else(|| route.id.clone());

        if route.is_terminal() {
            debug!(action_id = action.id, route_id = %route.id, "Terminal route selected");
            return Ok(RoutingResult::complete().with_matched_condition(matched));
        }

        let result = match route.next_action_ids.as_slice() {
            [single] => RoutingResult::next(RoutedAction {
                action_id: *single,
                participant_id: sender_of(blueprint, *single),
                branch_id: None,
                matched_route_id: Some(route.id.clone()),
            }),
            targets => RoutingResult::parallel(
                targets
                    .iter()
                    .map(|target| RoutedAction {
                        action_id: *target,
                        participant_id: sender_of(blueprint, *target),
                        branch_id: Some(uuid::Uuid::new_v4().to_string()),
                        matched_route_id: Some(route.id.clone()),
                    })
                    .collect(),
            ),
        };

        Ok(result.with_matched_condition(matched))
    }

    fn legacy_conditions(
        &self,
        blueprint: &Blueprint,
        action: &Action,
        scope: &Value,
    ) -> EngineResult<RoutingResult> {
        let Some(participant_id) = self.evaluator.evaluate_conditions(scope, &action.participants)? else {
            debug!(action_id = action.id, "No participant condition matched");
            return Ok(RoutingResult::complete());
        };

        let Some(next) = blueprint.action_for_sender(&participant_id) else {
            warn!(
                action_id = action.id,
                participant = %participant_id,
                "Matched participant sends no action"
            );
            return Ok(RoutingResult::complete());
        };

        let matched = action
            .participants
            .iter()
            .find(|c| c.participant_id == participant_id)
            .and_then(|c| serde_json::to_string(&c.criteria).ok())
            .unwrap_or_default();

        Ok(RoutingResult::next(RoutedAction {
            action_id: next.id,
            participant_id: Some(participant_id),
            branch_id: None,
            matched_route_id: None,
        })
        .with_matched_condition(matched))
    }
}

fn sender_of(blueprint: &Blueprint, action_id: ActionId) -> Option<String> {
    let sender = blueprint.action(action_id).map(|a| a.sender.clone());
    if sender.is_none() {
        warn!(blueprint_id = %blueprint.id, action_id, "Route targets unknown action");
    }
    sender
}
