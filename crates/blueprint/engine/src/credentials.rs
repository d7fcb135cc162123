//! Credential gate matching, claim mapping and expiry computation
//!
//! Token signatures are checked and created by external services. What
//! stays here is the part that depends only on blueprint configuration:
//! matching decoded presentations against requirements, building the
//! claim set for an issued credential, and turning an ISO-8601 duration
//! into an expiry instant.

use async_trait::async_trait;
use blueprint_types::{
    CredentialFailureReason, CredentialIssuanceConfig, CredentialPresentation,
    CredentialRequirement, CredentialValidationError, CredentialValidationResult, DataMap,
    VerifiedCredential,
};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::debug;

use crate::error::CollaboratorError;
use crate::traits::CredentialVerifier;

// ── Requirement matching ─────────────────────────────────────────────

/// Verifier over already-decoded presentations.
///
/// A requirement is satisfied by a presentation of the same type, from an
/// accepted issuer, carrying every required claim (with the expected value
/// where one is given). Every requirement must be satisfied.
#[derive(Clone, Debug, Default)]
pub struct RequirementMatcher;

impl RequirementMatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn check(
        &self,
        requirements: &[CredentialRequirement],
        presentations: &[CredentialPresentation],
    ) -> CredentialValidationResult {
        let mut verified = Vec::new();
        let mut errors = Vec::new();

        for requirement in requirements {
            match match_requirement(requirement, presentations) {
                Ok(presentation) => verified.push(VerifiedCredential {
                    credential_id: presentation.credential_id.clone(),
                    credential_type: presentation.credential_type.clone(),
                    issuer_id: presentation.issuer_id.clone(),
                    claims: presentation.claims.clone(),
                }),
                Err(error) => {
                    debug!(
                        requirement = %requirement.credential_type,
                        reason = %error.failure_reason,
                        "Credential requirement not met"
                    );
                    errors.push(error);
                }
            }
        }

        if errors.is_empty() {
            CredentialValidationResult::valid(verified)
        } else {
            CredentialValidationResult::invalid(errors)
        }
    }
}

#[async_trait]
impl CredentialVerifier for RequirementMatcher {
    async fn verify(
        &self,
        requirements: &[CredentialRequirement],
        presentations: &[CredentialPresentation],
    ) -> Result<CredentialValidationResult, CollaboratorError> {
        Ok(self.check(requirements, presentations))
    }
}

fn match_requirement<'a>(
    requirement: &CredentialRequirement,
    presentations: &'a [CredentialPresentation],
) -> Result<&'a CredentialPresentation, CredentialValidationError> {
    let fail = |failure_reason: CredentialFailureReason, message: String| CredentialValidationError {
        requirement_type: requirement.credential_type.clone(),
        failure_reason,
        message,
    };

    let of_type: Vec<&CredentialPresentation> = presentations
        .iter()
        .filter(|p| p.credential_type == requirement.credential_type)
        .collect();
    if of_type.is_empty() {
        return Err(fail(
            CredentialFailureReason::Missing,
            format!("No credential of type '{}' presented", requirement.credential_type),
        ));
    }

    let accepted: Vec<&CredentialPresentation> = of_type
        .into_iter()
        .filter(|p| requirement.accepts_issuer(&p.issuer_id))
        .collect();
    if accepted.is_empty() {
        return Err(fail(
            CredentialFailureReason::IssuerNotAccepted,
            format!(
                "Credential '{}' issuer not in accepted list [{}]",
                requirement.credential_type,
                requirement.accepted_issuers.join(", ")
            ),
        ));
    }

    let mut first_problem = None;
    for presentation in accepted {
        match claim_problem(requirement, presentation) {
            None => return Ok(presentation),
            Some(problem) => {
                first_problem.get_or_insert(problem);
            }
        }
    }

    Err(fail(
        CredentialFailureReason::ClaimMismatch,
        first_problem.unwrap_or_else(|| "Required claims not satisfied".into()),
    ))
}

fn claim_problem(
    requirement: &CredentialRequirement,
    presentation: &CredentialPresentation,
) -> Option<String> {
    requirement.required_claims.iter().find_map(|constraint| {
        match (presentation.claims.get(&constraint.claim_name), &constraint.expected_value) {
            (None, _) => Some(format!("Claim '{}' is missing", constraint.claim_name)),
            (Some(actual), Some(expected)) if actual != expected => Some(format!(
                "Claim '{}' expected {} but was {}",
                constraint.claim_name, expected, actual
            )),
            _ => None,
        }
    })
}

// ── Claim mapping ────────────────────────────────────────────────────

/// Build the claim set for an issued credential from action data.
///
/// Each mapping copies one top-level field (a leading `/` on the source
/// is ignored). Missing fields are skipped. The standard `type` and `vct`
/// claims are always set to the credential type.
pub fn map_claims(config: &CredentialIssuanceConfig, data: &DataMap) -> DataMap {
    let mut claims = DataMap::new();
    for mapping in &config.claim_mappings {
        let field = mapping.source_field.trim_start_matches('/');
        if let Some(value) = data.get(field) {
            claims.insert(mapping.claim_name.clone(), value.clone());
        }
    }
    claims.insert("type".into(), Value::String(config.credential_type.clone()));
    claims.insert("vct".into(), Value::String(config.credential_type.clone()));
    claims
}

// ── Expiry ───────────────────────────────────────────────────────────

/// Expiry instant for a credential issued at `issued_at`.
///
/// No duration means no expiry. A duration that does not parse falls back
/// to `default_days`.
pub fn compute_expiry(
    duration: Option<&str>,
    issued_at: DateTime<Utc>,
    default_days: i64,
) -> Option<DateTime<Utc>> {
    let raw = duration?.trim();
    if raw.is_empty() {
        return None;
    }
    let span = parse_iso8601_duration(raw).unwrap_or_else(|| {
        debug!(duration = raw, default_days, "Unparseable expiry duration");
        Duration::try_days(default_days).unwrap_or_else(Duration::zero)
    });
    issued_at.checked_add_signed(span)
}

const SECS_PER_MINUTE: f64 = 60.0;
const SECS_PER_HOUR: f64 = 3_600.0;
const SECS_PER_DAY: f64 = 86_400.0;

/// Parse `PnYnMnWnDTnHnMnS`. Years count as 365 days and months as 30.
/// Returns `None` for anything malformed, including a bare `P`.
pub fn parse_iso8601_duration(text: &str) -> Option<Duration> {
    let body = text.trim().strip_prefix('P').or_else(|| text.trim().strip_prefix('p'))?;
    if body.is_empty() {
        return None;
    }

    let mut seconds = 0.0_f64;
    let mut in_time = false;
    let mut number = String::new();
    let mut saw_component = false;
    let mut saw_time_component = false;

    for c in body.chars() {
        match c.to_ascii_uppercase() {
            'T' => {
                if in_time || !number.is_empty() {
                    return None;
                }
                in_time = true;
            }
            d if d.is_ascii_digit() || d == '.' || d == ',' => {
                number.push(if d == ',' { '.' } else { d });
            }
            unit => {
                let value: f64 = number.parse().ok()?;
                number.clear();
                let scale = match (unit, in_time) {
                    ('Y', false) => 365.0 * SECS_PER_DAY,
                    ('M', false) => 30.0 * SECS_PER_DAY,
                    ('W', false) => 7.0 * SECS_PER_DAY,
                    ('D', false) => SECS_PER_DAY,
                    ('H', true) => SECS_PER_HOUR,
                    ('M', true) => SECS_PER_MINUTE,
                    ('S', true) => 1.0,
                    _ => return None,
                };
                seconds += value * scale;
                saw_component = true;
                saw_time_component |= in_time;
            }
        }
    }

    if !number.is_empty() || !saw_component || (in_time && !saw_time_component) {
        return None;
    }
    Duration::try_milliseconds((seconds * 1000.0).round() as i64)
}
