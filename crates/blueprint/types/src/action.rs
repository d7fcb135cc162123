//! Actions: one step of a blueprint
//!
//! An action validates submitted data against its form schema, derives
//! calculated fields, decides where the workflow goes next, discloses
//! subsets of the data to participants, and optionally gates entry and
//! exit on verifiable credentials.

use crate::{CredentialIssuanceConfig, CredentialRequirement, DataMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Action identifier. Authored ids are small non-negative integers; the
/// signed representation lets the graph validator report negative ids
/// instead of failing to deserialize them.
pub type ActionId = i32;

/// Criteria literal that always matches in a legacy condition list
pub const ALWAYS_CRITERION: &str = "always";

// ── Action ───────────────────────────────────────────────────────────

/// One workflow step
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: ActionId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Participant id of the party that performs this action
    pub sender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Form carrying the schema submitted data is validated against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<Form>,
    /// Calculation name → logic expression, evaluated in declaration order
    #[serde(default, skip_serializing_if = "DataMap::is_empty")]
    pub calculations: DataMap,
    /// Static routing condition consumed by the graph validator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
    /// Legacy first-match participant routing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participants: Vec<Condition>,
    /// Route table; takes precedence over `participants` when non-empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<Route>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disclosures: Vec<Disclosure>,
    /// Entry gate: credentials the sender must present
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credential_requirements: Vec<CredentialRequirement>,
    /// Exit action: credential issued once the action completes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_issuance: Option<CredentialIssuanceConfig>,
}

impl Action {
    pub fn new(id: ActionId, title: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            sender: sender.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Attach a form whose schema validates submitted data
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.form = Some(Form::new(schema));
        self
    }

    /// Append a calculation; later calculations may read earlier results
    pub fn with_calculation(mut self, name: impl Into<String>, expression: Value) -> Self {
        self.calculations.insert(name.into(), expression);
        self
    }

    pub fn with_condition(mut self, condition: Value) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_participant_condition(mut self, condition: Condition) -> Self {
        self.participants.push(condition);
        self
    }

    pub fn with_route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn with_disclosure(mut self, disclosure: Disclosure) -> Self {
        self.disclosures.push(disclosure);
        self
    }

    pub fn with_credential_requirement(mut self, requirement: CredentialRequirement) -> Self {
        self.credential_requirements.push(requirement);
        self
    }

    pub fn with_credential_issuance(mut self, config: CredentialIssuanceConfig) -> Self {
        self.credential_issuance = Some(config);
        self
    }

    /// The schema submitted data must satisfy, if any
    pub fn schema(&self) -> Option<&Value> {
        self.form.as_ref().and_then(|f| f.schema.as_ref())
    }

    pub fn has_routes(&self) -> bool {
        !self.routes.is_empty()
    }

    pub fn requires_credentials(&self) -> bool {
        !self.credential_requirements.is_empty()
    }
}

// ── Form ─────────────────────────────────────────────────────────────

/// Data-entry form of an action. Only the schema matters to the engine;
/// layout hints are carried through untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Value>,
}

impl Form {
    pub fn new(schema: Value) -> Self {
        Self {
            schema: Some(schema),
            ..Default::default()
        }
    }
}

// ── Legacy Condition ─────────────────────────────────────────────────

/// Legacy routing entry: a participant plus boolean criteria.
///
/// A condition matches when every criterion is truthy. Empty criteria,
/// or a criterion equal to [`ALWAYS_CRITERION`], match unconditionally.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub participant_id: String,
    #[serde(default)]
    pub criteria: Vec<Value>,
}

impl Condition {
    pub fn new(participant_id: impl Into<String>, criteria: Vec<Value>) -> Self {
        Self {
            participant_id: participant_id.into(),
            criteria,
        }
    }

    /// A condition with no criteria
    pub fn always(participant_id: impl Into<String>) -> Self {
        Self::new(participant_id, Vec::new())
    }

    pub fn is_unconditional(&self) -> bool {
        self.criteria.is_empty() || self.criteria.iter().all(is_always_criterion)
    }
}

/// Whether a single criterion is the literal always-match sentinel
pub fn is_always_criterion(criterion: &Value) -> bool {
    match criterion {
        Value::Bool(true) => true,
        Value::String(s) => s.trim().eq_ignore_ascii_case(ALWAYS_CRITERION),
        _ => false,
    }
}

// ── Route ────────────────────────────────────────────────────────────

/// One entry in an action's ordered route table
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    /// Logic expression; a route without a condition always matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
    #[serde(default)]
    pub next_action_ids: Vec<ActionId>,
    /// Fallback route used when no conditional route matches
    #[serde(default)]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Route {
    pub fn new(id: impl Into<String>, next_action_ids: Vec<ActionId>) -> Self {
        Self {
            id: id.into(),
            next_action_ids,
            ..Default::default()
        }
    }

    /// A conditional route
    pub fn when(
        id: impl Into<String>,
        condition: Value,
        next_action_ids: Vec<ActionId>,
    ) -> Self {
        Self {
            condition: Some(condition),
            ..Self::new(id, next_action_ids)
        }
    }

    /// The fallback route
    pub fn default_route(id: impl Into<String>, next_action_ids: Vec<ActionId>) -> Self {
        Self {
            is_default: true,
            ..Self::new(id, next_action_ids)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.next_action_ids.is_empty()
    }
}

// ── Disclosure ───────────────────────────────────────────────────────

/// Which fields of the action data a participant may see
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disclosure {
    pub participant_address: String,
    /// JSON-pointer style references (`/field`, `#/field`, `/*`)
    #[serde(default)]
    pub data_pointers: Vec<String>,
}

impl Disclosure {
    pub fn new<I, S>(participant_address: impl Into<String>, data_pointers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            participant_address: participant_address.into(),
            data_pointers: data_pointers.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_builder() {
        let action = Action::new(1, "Approve", "manager")
            .with_schema(json!({"type": "object", "required": ["amount"]}))
            .with_calculation("tax", json!({"*": [{"var": "amount"}, 0.2]}))
            .with_calculation("total", json!({"+": [{"var": "amount"}, {"var": "tax"}]}))
            .with_route(Route::default_route("done", vec![]))
            .with_disclosure(Disclosure::new("auditor", ["/*"]));

        assert!(action.schema().is_some());
        assert!(action.has_routes());
        assert!(!action.requires_credentials());
        let names: Vec<&String> = action.calculations.keys().collect();
        assert_eq!(names, vec!["tax", "total"]);
    }

    #[test]
    fn test_calculation_order_survives_json() {
        let doc = json!({
            "id": 2,
            "title": "Price",
            "sender": "seller",
            "calculations": {
                "zeta": {"var": "a"},
                "alpha": {"var": "zeta"}
            }
        });
        let action: Action = serde_json::from_value(doc).unwrap();
        let names: Vec<&str> = action.calculations.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_condition_unconditional() {
        assert!(Condition::always("p").is_unconditional());
        assert!(Condition::new("p", vec![json!("always")]).is_unconditional());
        assert!(Condition::new("p", vec![json!(true)]).is_unconditional());
        assert!(!Condition::new("p", vec![json!({">": [1, 0]})]).is_unconditional());
    }

    #[test]
    fn test_route_constructors() {
        let r = Route::when("big", json!({">": [{"var": "amount"}, 10]}), vec![3]);
        assert!(!r.is_default);
        assert!(r.condition.is_some());

        let d = Route::default_route("fallback", vec![]);
        assert!(d.is_default);
        assert!(d.is_terminal());
    }

    #[test]
    fn test_route_json_shape() {
        let doc = json!({"id": "r1", "nextActionIds": [2, 3], "isDefault": true});
        let r: Route = serde_json::from_value(doc).unwrap();
        assert_eq!(r.next_action_ids, vec![2, 3]);
        assert!(r.is_default);
    }
}
