//! Per-invocation execution records
//!
//! An [`ExecutionContext`] is built by the caller for one submission of
//! one action; the processor answers with a single [`ExecutionResult`].
//! Neither is shared across invocations.

use crate::{
    Action, Blueprint, CredentialPresentation, CredentialValidationResult, DataMap,
    IssuanceSigningContext, IssuedCredentialInfo, RoutingResult,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ── Context ──────────────────────────────────────────────────────────

/// Everything the processor needs to run one action
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    pub blueprint: Arc<Blueprint>,
    pub action: Action,
    /// Field name → value as submitted by the participant
    pub submitted_data: DataMap,
    pub participant_id: String,
    pub wallet_address: String,
    /// Data carried forward from the previous step
    pub previous_data: Option<DataMap>,
    pub credential_presentations: Vec<CredentialPresentation>,
    pub signing_context: Option<IssuanceSigningContext>,
}

impl ExecutionContext {
    pub fn new(blueprint: Arc<Blueprint>, action: Action, submitted_data: DataMap) -> Self {
        let participant_id = action.sender.clone();
        Self {
            blueprint,
            action,
            submitted_data,
            participant_id,
            wallet_address: String::new(),
            previous_data: None,
            credential_presentations: Vec::new(),
            signing_context: None,
        }
    }

    pub fn with_participant(mut self, participant_id: impl Into<String>) -> Self {
        self.participant_id = participant_id.into();
        self
    }

    pub fn with_wallet_address(mut self, wallet_address: impl Into<String>) -> Self {
        self.wallet_address = wallet_address.into();
        self
    }

    pub fn with_previous_data(mut self, previous: DataMap) -> Self {
        self.previous_data = Some(previous);
        self
    }

    pub fn with_presentation(mut self, presentation: CredentialPresentation) -> Self {
        self.credential_presentations.push(presentation);
        self
    }

    pub fn with_signing_context(mut self, signing: IssuanceSigningContext) -> Self {
        self.signing_context = Some(signing);
        self
    }
}

// ── Schema validation ────────────────────────────────────────────────

/// A single schema violation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaValidationError {
    /// Schema keyword that failed, e.g. `required`
    pub keyword: String,
    /// Location in the instance document, e.g. `/amount`
    pub instance_location: String,
    pub message: String,
}

impl SchemaValidationError {
    pub fn new(
        keyword: impl Into<String>,
        instance_location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            instance_location: instance_location.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SchemaValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at '{}': {}", self.keyword, self.instance_location, self.message)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaValidationResult {
    pub is_valid: bool,
    #[serde(default)]
    pub errors: Vec<SchemaValidationError>,
}

impl SchemaValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn invalid(errors: Vec<SchemaValidationError>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

impl Default for SchemaValidationResult {
    fn default() -> Self {
        Self::valid()
    }
}

// ── Disclosure ───────────────────────────────────────────────────────

/// The projection of the action data one participant receives
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisclosureResult {
    pub participant_address: String,
    pub disclosed_data: DataMap,
}

impl DisclosureResult {
    pub fn field_count(&self) -> usize {
        self.disclosed_data.len()
    }
}

// ── Result ───────────────────────────────────────────────────────────

/// Everything one run of the action pipeline produced
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub validation: SchemaValidationResult,
    /// Submitted data merged with calculated values
    pub processed_data: DataMap,
    pub calculated_values: DataMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<RoutingResult>,
    pub disclosures: Vec<DisclosureResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_validation: Option<CredentialValidationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_credential: Option<IssuedCredentialInfo>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ExecutionResult {
    /// A result that has not failed yet
    pub fn pending() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    /// Mark the run as failed with a human-readable reason
    pub fn fail(&mut self, error: impl Into<String>) {
        self.success = false;
        self.errors.push(error.into());
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn is_workflow_complete(&self) -> bool {
        self.routing
            .as_ref()
            .map(|r| r.is_workflow_complete)
            .unwrap_or(false)
    }

    /// Disclosure addressed to a participant, if one was produced
    pub fn disclosure_for(&self, participant_address: &str) -> Option<&DisclosureResult> {
        self.disclosures
            .iter()
            .find(|d| d.participant_address == participant_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_defaults_participant_to_sender() {
        let bp = Arc::new(Blueprint::new("ctx"));
        let ctx = ExecutionContext::new(bp, Action::new(0, "Start", "alice"), DataMap::new());
        assert_eq!(ctx.participant_id, "alice");
        assert!(ctx.previous_data.is_none());
        assert!(ctx.signing_context.is_none());
    }

    #[test]
    fn test_result_fail_and_warn() {
        let mut result = ExecutionResult::pending();
        assert!(result.success);

        result.warn("workflow complete");
        assert!(result.success);

        result.fail("Schema validation failed");
        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_disclosure_lookup() {
        let mut data = DataMap::new();
        data.insert("orderId".into(), json!("PO-1"));
        let result = ExecutionResult {
            disclosures: vec![DisclosureResult {
                participant_address: "buyer".into(),
                disclosed_data: data,
            }],
            ..ExecutionResult::pending()
        };
        assert_eq!(result.disclosure_for("buyer").unwrap().field_count(), 1);
        assert!(result.disclosure_for("seller").is_none());
    }

    #[test]
    fn test_schema_error_display() {
        let e = SchemaValidationError::new("required", "/amount", "amount is required");
        assert_eq!(e.to_string(), "required at '/amount': amount is required");
    }
}
