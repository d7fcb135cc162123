//! Verifiable credential gating and issuance records
//!
//! The engine never signs or verifies tokens itself. It carries the
//! configuration (what an action requires, what it issues) and the
//! decoded results that external verifier/issuer services hand back.

use crate::DataMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Entry gate ───────────────────────────────────────────────────────

/// A credential the sender must present before an action may run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequirement {
    /// Credential type (`vct`) that satisfies this requirement
    #[serde(rename = "type")]
    pub credential_type: String,
    /// Issuers whose credentials are accepted; empty accepts any issuer
    #[serde(default)]
    pub accepted_issuers: Vec<String>,
    #[serde(default)]
    pub required_claims: Vec<ClaimConstraint>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl CredentialRequirement {
    pub fn new(credential_type: impl Into<String>) -> Self {
        Self {
            credential_type: credential_type.into(),
            ..Default::default()
        }
    }

    pub fn with_accepted_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.accepted_issuers.push(issuer.into());
        self
    }

    /// Require a claim to be present, with any value
    pub fn with_claim(mut self, claim_name: impl Into<String>) -> Self {
        self.required_claims.push(ClaimConstraint {
            claim_name: claim_name.into(),
            expected_value: None,
        });
        self
    }

    /// Require a claim to be present with an exact value
    pub fn with_claim_value(mut self, claim_name: impl Into<String>, value: Value) -> Self {
        self.required_claims.push(ClaimConstraint {
            claim_name: claim_name.into(),
            expected_value: Some(value),
        });
        self
    }

    pub fn accepts_issuer(&self, issuer: &str) -> bool {
        self.accepted_issuers.is_empty() || self.accepted_issuers.iter().any(|i| i == issuer)
    }
}

/// A claim that must appear on a presented credential
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimConstraint {
    pub claim_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<Value>,
}

/// A credential as presented by a participant, already decoded by the
/// token layer
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPresentation {
    pub credential_id: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub issuer_id: String,
    #[serde(default)]
    pub claims: DataMap,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_token: String,
}

impl CredentialPresentation {
    pub fn new(
        credential_id: impl Into<String>,
        credential_type: impl Into<String>,
        issuer_id: impl Into<String>,
    ) -> Self {
        Self {
            credential_id: credential_id.into(),
            credential_type: credential_type.into(),
            issuer_id: issuer_id.into(),
            ..Default::default()
        }
    }

    pub fn with_claim(mut self, name: impl Into<String>, value: Value) -> Self {
        self.claims.insert(name.into(), value);
        self
    }
}

/// Why a requirement was not satisfied
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialFailureReason {
    /// No presentation of the required type
    Missing,
    /// A presentation exists but its issuer is not accepted
    IssuerNotAccepted,
    /// A required claim is absent or has the wrong value
    ClaimMismatch,
}

impl std::fmt::Display for CredentialFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "Missing"),
            Self::IssuerNotAccepted => write!(f, "IssuerNotAccepted"),
            Self::ClaimMismatch => write!(f, "ClaimMismatch"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialValidationError {
    pub requirement_type: String,
    pub failure_reason: CredentialFailureReason,
    pub message: String,
}

/// A presentation that satisfied a requirement
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedCredential {
    pub credential_id: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub issuer_id: String,
    #[serde(default)]
    pub claims: DataMap,
}

/// Outcome of checking presentations against an action's requirements
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialValidationResult {
    pub is_valid: bool,
    #[serde(default)]
    pub verified_credentials: Vec<VerifiedCredential>,
    #[serde(default)]
    pub errors: Vec<CredentialValidationError>,
}

impl CredentialValidationResult {
    pub fn valid(verified_credentials: Vec<VerifiedCredential>) -> Self {
        Self {
            is_valid: true,
            verified_credentials,
            errors: Vec::new(),
        }
    }

    pub fn invalid(errors: Vec<CredentialValidationError>) -> Self {
        Self {
            is_valid: false,
            verified_credentials: Vec::new(),
            errors,
        }
    }
}

// ── Exit action ──────────────────────────────────────────────────────

/// How an issued credential may be used
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsagePolicy {
    #[default]
    Reusable,
    SingleUse,
    LimitedUse,
}

/// Copies one field of the action data into an issued claim
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimMapping {
    pub claim_name: String,
    /// Top-level field name; a leading `/` is ignored
    pub source_field: String,
}

impl ClaimMapping {
    pub fn new(claim_name: impl Into<String>, source_field: impl Into<String>) -> Self {
        Self {
            claim_name: claim_name.into(),
            source_field: source_field.into(),
        }
    }
}

/// Credential issued when an action completes
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialIssuanceConfig {
    pub credential_type: String,
    #[serde(default)]
    pub claim_mappings: Vec<ClaimMapping>,
    /// Recipient override; defaults to the submitting wallet address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    /// ISO-8601 duration, e.g. `P1Y` or `P30D`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_duration: Option<String>,
    #[serde(default)]
    pub usage_policy: UsagePolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_presentations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_config: Option<Value>,
}

impl CredentialIssuanceConfig {
    pub fn new(credential_type: impl Into<String>) -> Self {
        Self {
            credential_type: credential_type.into(),
            ..Default::default()
        }
    }

    pub fn with_mapping(mut self, claim_name: impl Into<String>, source_field: impl Into<String>) -> Self {
        self.claim_mappings.push(ClaimMapping::new(claim_name, source_field));
        self
    }

    pub fn with_expiry(mut self, duration: impl Into<String>) -> Self {
        self.expiry_duration = Some(duration.into());
        self
    }

    pub fn with_usage_policy(mut self, policy: UsagePolicy, max_presentations: Option<u32>) -> Self {
        self.usage_policy = policy;
        self.max_presentations = max_presentations;
        self
    }
}

/// Key material the issuer signs with. Supplied per invocation by the
/// hosting service; never persisted with the blueprint.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceSigningContext {
    pub issuer_id: String,
    pub signing_key: Vec<u8>,
    pub algorithm: String,
}

impl IssuanceSigningContext {
    pub fn new(issuer_id: impl Into<String>, signing_key: Vec<u8>, algorithm: impl Into<String>) -> Self {
        Self {
            issuer_id: issuer_id.into(),
            signing_key,
            algorithm: algorithm.into(),
        }
    }
}

impl std::fmt::Debug for IssuanceSigningContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuanceSigningContext")
            .field("issuer_id", &self.issuer_id)
            .field("signing_key", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// Record of a credential issued at the end of an action
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCredentialInfo {
    pub credential_id: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub issuer_id: String,
    pub subject_id: String,
    pub issued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub claims: DataMap,
    pub raw_token: String,
    pub usage_policy: UsagePolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_presentations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_config_json: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_requirement_accepts_issuer() {
        let open = CredentialRequirement::new("KycCredential");
        assert!(open.accepts_issuer("anyone"));

        let closed = CredentialRequirement::new("KycCredential").with_accepted_issuer("did:bank");
        assert!(closed.accepts_issuer("did:bank"));
        assert!(!closed.accepts_issuer("did:other"));
    }

    #[test]
    fn test_requirement_json_uses_type_key() {
        let req = CredentialRequirement::new("License").with_claim_value("class", json!("B"));
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["type"], "License");
        assert_eq!(v["requiredClaims"][0]["expectedValue"], "B");
    }

    #[test]
    fn test_signing_context_debug_redacts_key() {
        let ctx = IssuanceSigningContext::new("did:issuer", vec![1, 2, 3], "ES256");
        let rendered = format!("{:?}", ctx);
        assert!(rendered.contains("redacted"));
        assert!(!rendered.contains("[1, 2, 3]"));
    }

    #[test]
    fn test_validation_result_constructors() {
        assert!(CredentialValidationResult::valid(vec![]).is_valid);
        let invalid = CredentialValidationResult::invalid(vec![CredentialValidationError {
            requirement_type: "Kyc".into(),
            failure_reason: CredentialFailureReason::Missing,
            message: "not presented".into(),
        }]);
        assert!(!invalid.is_valid);
        assert_eq!(invalid.errors[0].failure_reason.to_string(), "Missing");
    }
}
