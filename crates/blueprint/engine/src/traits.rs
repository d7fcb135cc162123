use async_trait::async_trait;
use blueprint_types::{
    CredentialPresentation, CredentialRequirement, CredentialValidationResult, DataMap,
    IssuedCredentialInfo, SchemaValidationResult, UsagePolicy,
};
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::CollaboratorError;

/// Validates submitted data against an action's form schema.
///
/// Schema parsing and the validation algorithm live behind this trait;
/// the pipeline only consumes the result shape.
#[async_trait]
pub trait SchemaValidator: Send + Sync {
    async fn validate(
        &self,
        data: &DataMap,
        schema: &Value,
    ) -> Result<SchemaValidationResult, CollaboratorError>;
}

/// Checks presented credentials against an action's entry requirements
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(
        &self,
        requirements: &[CredentialRequirement],
        presentations: &[CredentialPresentation],
    ) -> Result<CredentialValidationResult, CollaboratorError>;
}

/// Everything an issuer needs to mint one credential
#[derive(Clone)]
pub struct IssuanceRequest {
    pub credential_type: String,
    /// Mapped claims, including the standard `type`/`vct` claims
    pub claims: DataMap,
    pub issuer_id: String,
    pub recipient_id: String,
    pub signing_key: Vec<u8>,
    pub algorithm: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_policy: UsagePolicy,
    pub max_presentations: Option<u32>,
    pub display_config: Option<Value>,
}

impl std::fmt::Debug for IssuanceRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuanceRequest")
            .field("credential_type", &self.credential_type)
            .field("issuer_id", &self.issuer_id)
            .field("recipient_id", &self.recipient_id)
            .field("signing_key", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Signs and issues a credential at the end of an action
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    async fn issue(&self, request: IssuanceRequest) -> Result<IssuedCredentialInfo, CollaboratorError>;
}
