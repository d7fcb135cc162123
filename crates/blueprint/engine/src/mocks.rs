use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use blueprint_types::{
    CredentialPresentation, CredentialRequirement, CredentialValidationResult, DataMap,
    IssuedCredentialInfo, SchemaValidationError, SchemaValidationResult,
};
use serde_json::Value;

use crate::credentials::RequirementMatcher;
use crate::error::CollaboratorError;
use crate::traits::{CredentialIssuer, CredentialVerifier, IssuanceRequest, SchemaValidator};

/// Mock schema validator for testing.
///
/// Understands the `required` keyword and primitive `type` checks on
/// `properties`, which is enough to drive the pipeline. Counts every call.
pub struct MockSchemaValidator {
    invocations: AtomicUsize,
    delay: Option<Duration>,
}

impl MockSchemaValidator {
    pub fn new() -> Self {
        Self {
            invocations: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Sleep before answering, to exercise collaborator deadlines
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    fn check(data: &DataMap, schema: &Value) -> Vec<SchemaValidationError> {
        let mut errors = Vec::new();

        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for field in required.iter().filter_map(Value::as_str) {
                if !data.contains_key(field) {
                    errors.push(SchemaValidationError::new(
                        "required",
                        "",
                        format!("Required property '{}' not found", field),
                    ));
                }
            }
        }

        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (name, property) in properties {
                let (Some(value), Some(expected)) =
                    (data.get(name), property.get("type").and_then(Value::as_str))
                else {
                    continue;
                };
                if !matches_type(value, expected) {
                    errors.push(SchemaValidationError::new(
                        "type",
                        format!("/{}", name),
                        format!("Expected {} but found {}", expected, type_name(value)),
                    ));
                }
            }
        }

        errors
    }
}

impl Default for MockSchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchemaValidator for MockSchemaValidator {
    async fn validate(
        &self,
        data: &DataMap,
        schema: &Value,
    ) -> Result<SchemaValidationResult, CollaboratorError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let errors = Self::check(data, schema);
        if errors.is_empty() {
            Ok(SchemaValidationResult::valid())
        } else {
            Ok(SchemaValidationResult::invalid(errors))
        }
    }
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Schema validator whose backing service is always down
pub struct FailingSchemaValidator;

#[async_trait]
impl SchemaValidator for FailingSchemaValidator {
    async fn validate(
        &self,
        _data: &DataMap,
        _schema: &Value,
    ) -> Result<SchemaValidationResult, CollaboratorError> {
        Err(CollaboratorError::unavailable("schema validator", "mock failure"))
    }
}

/// Mock credential verifier for testing.
///
/// Matches requirements the way [`RequirementMatcher`] does, or fails
/// outright when built with [`failing`](Self::failing). Counts every call.
pub struct MockCredentialVerifier {
    fail: bool,
    delay: Option<Duration>,
    invocations: AtomicUsize,
}

impl MockCredentialVerifier {
    pub fn new() -> Self {
        Self {
            fail: false,
            delay: None,
            invocations: AtomicUsize::new(0),
        }
    }

    /// Create a verifier whose backing service is always down
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Sleep before answering, to exercise collaborator deadlines
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl Default for MockCredentialVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialVerifier for MockCredentialVerifier {
    async fn verify(
        &self,
        requirements: &[CredentialRequirement],
        presentations: &[CredentialPresentation],
    ) -> Result<CredentialValidationResult, CollaboratorError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(CollaboratorError::unavailable("credential verifier", "mock failure"));
        }
        Ok(RequirementMatcher::new().check(requirements, presentations))
    }
}

/// Mock credential issuer for testing.
///
/// Echoes the request back as an issued credential and remembers every
/// request it saw.
pub struct MockCredentialIssuer {
    fail: bool,
    requests: Mutex<Vec<IssuanceRequest>>,
}

impl MockCredentialIssuer {
    /// Create an issuer that issues everything
    pub fn new() -> Self {
        Self {
            fail: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create an issuer that rejects everything
    pub fn failing() -> Self {
        Self {
            fail: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<IssuanceRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Default for MockCredentialIssuer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialIssuer for MockCredentialIssuer {
    async fn issue(&self, request: IssuanceRequest) -> Result<IssuedCredentialInfo, CollaboratorError> {
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(request.clone());
        }
        if self.fail {
            return Err(CollaboratorError::rejected("credential issuer", "mock rejection"));
        }

        let credential_id = uuid::Uuid::new_v4().to_string();
        Ok(IssuedCredentialInfo {
            raw_token: format!("mock~{}~{}", request.algorithm, credential_id),
            credential_id,
            credential_type: request.credential_type,
            issuer_id: request.issuer_id,
            subject_id: request.recipient_id,
            issued_at: request.issued_at,
            expires_at: request.expires_at,
            claims: request.claims,
            usage_policy: request.usage_policy,
            max_presentations: request.max_presentations,
            display_config_json: request.display_config.map(|c| c.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> DataMap {
        match value {
            Value::Object(m) => m,
            _ => DataMap::new(),
        }
    }

    #[tokio::test]
    async fn mock_schema_validator_checks_required_and_types() {
        let validator = MockSchemaValidator::new();
        let schema = json!({
            "type": "object",
            "required": ["amount", "currency"],
            "properties": {"amount": {"type": "number"}, "currency": {"type": "string"}}
        });

        let ok = validator
            .validate(&data(json!({"amount": 5, "currency": "EUR"})), &schema)
            .await
            .unwrap();
        assert!(ok.is_valid);

        let bad = validator
            .validate(&data(json!({"amount": "five"})), &schema)
            .await
            .unwrap();
        assert!(!bad.is_valid);
        assert_eq!(bad.errors.len(), 2);
        assert_eq!(validator.invocations(), 2);
    }

    #[tokio::test]
    async fn mock_credential_verifier_matches_or_fails() {
        let requirements = vec![CredentialRequirement::new("BuyerLicense")];

        let verifier = MockCredentialVerifier::new();
        let verdict = verifier.verify(&requirements, &[]).await.unwrap();
        assert!(!verdict.is_valid);
        assert_eq!(verifier.invocations(), 1);

        let err = MockCredentialVerifier::failing()
            .verify(&requirements, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn failing_schema_validator_errors() {
        let err = FailingSchemaValidator
            .validate(&DataMap::new(), &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::Unavailable { .. }));
    }
}
