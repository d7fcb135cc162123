//! Routing results: where the workflow goes after an action

use crate::ActionId;
use serde::{Deserialize, Serialize};

/// One branch the workflow continues on
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedAction {
    pub action_id: ActionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    /// Set on parallel fan-out so branches can be joined later
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_route_id: Option<String>,
}

/// Outcome of resolving the next step(s) of a workflow.
///
/// `is_workflow_complete` and a non-empty `next_actions` are mutually
/// exclusive. The singular `next_action_id` / `next_participant_id`
/// fields mirror the first entry of `next_actions` for callers that
/// predate parallel routing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingResult {
    pub is_workflow_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action_id: Option<ActionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_participant_id: Option<String>,
    #[serde(default)]
    pub next_actions: Vec<RoutedAction>,
    #[serde(default)]
    pub is_parallel: bool,
    /// Text of the condition or route that selected this outcome
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_to_participant: Option<String>,
}

impl RoutingResult {
    /// The workflow has no further steps
    pub fn complete() -> Self {
        Self {
            is_workflow_complete: true,
            ..Default::default()
        }
    }

    /// Continue on a single branch
    pub fn next(routed: RoutedAction) -> Self {
        Self::from_branches(vec![routed], false)
    }

    /// Fan out to several branches at once
    pub fn parallel(branches: Vec<RoutedAction>) -> Self {
        Self::from_branches(branches, true)
    }

    fn from_branches(next_actions: Vec<RoutedAction>, is_parallel: bool) -> Self {
        if next_actions.is_empty() {
            return Self::complete();
        }
        let first = &next_actions[0];
        Self {
            is_workflow_complete: false,
            next_action_id: Some(first.action_id),
            next_participant_id: first.participant_id.clone(),
            is_parallel,
            next_actions,
            matched_condition: None,
            rejected_to_participant: None,
        }
    }

    pub fn with_matched_condition(mut self, text: impl Into<String>) -> Self {
        self.matched_condition = Some(text.into());
        self
    }

    /// Ids of every branch target, in order
    pub fn next_action_ids(&self) -> Vec<ActionId> {
        self.next_actions.iter().map(|a| a.action_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(action_id: ActionId, participant: &str) -> RoutedAction {
        RoutedAction {
            action_id,
            participant_id: Some(participant.to_string()),
            branch_id: None,
            matched_route_id: None,
        }
    }

    #[test]
    fn test_complete_has_no_next() {
        let r = RoutingResult::complete();
        assert!(r.is_workflow_complete);
        assert!(r.next_actions.is_empty());
        assert!(r.next_action_id.is_none());
    }

    #[test]
    fn test_next_mirrors_first_branch() {
        let r = RoutingResult::next(branch(3, "director"));
        assert!(!r.is_workflow_complete);
        assert!(!r.is_parallel);
        assert_eq!(r.next_action_id, Some(3));
        assert_eq!(r.next_participant_id.as_deref(), Some("director"));
    }

    #[test]
    fn test_parallel_keeps_all_branches() {
        let r = RoutingResult::parallel(vec![branch(2, "legal"), branch(4, "finance")]);
        assert!(r.is_parallel);
        assert_eq!(r.next_action_ids(), vec![2, 4]);
        assert_eq!(r.next_action_id, Some(2));
    }

    #[test]
    fn test_empty_branches_collapse_to_complete() {
        let r = RoutingResult::parallel(vec![]);
        assert!(r.is_workflow_complete);
        assert!(!r.is_parallel);
    }

    #[test]
    fn test_rejection_is_read_from_wire_form() {
        let r: RoutingResult = serde_json::from_str(
            r#"{"isWorkflowComplete":false,"rejectedToParticipant":"buyer"}"#,
        )
        .unwrap();
        assert!(r.next_actions.is_empty());
        assert_eq!(r.rejected_to_participant.as_deref(), Some("buyer"));
    }
}
