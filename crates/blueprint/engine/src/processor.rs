//! Action processor: the fixed six-step execution pipeline
//!
//! | # | Step | Halts the run on |
//! |---|---|---|
//! | 0 | Credential gate | verification invalid or verifier failure |
//! | 1 | Schema validation | validation invalid or validator failure |
//! | 2 | Calculation | never |
//! | 3 | Routing | never |
//! | 4 | Disclosure | never |
//! | 5 | Credential issuance | never (best effort) |
//!
//! A halt at step 0 or 1 leaves processed data, calculated values and
//! disclosures empty. Later steps only ever add warnings.

use std::future::Future;
use std::sync::Arc;

use blueprint_logic::LogicEvaluator;
use blueprint_types::{DataMap, ExecutionContext, ExecutionResult, SchemaValidationResult};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, ProcessorConfig};
use crate::credentials::{compute_expiry, map_claims};
use crate::disclosure::create_disclosures;
use crate::error::CollaboratorError;
use crate::routing::RoutingEngine;
use crate::traits::{CredentialIssuer, CredentialVerifier, IssuanceRequest, SchemaValidator};

/// Marker carried by every credential gate failure message
pub const CREDENTIAL_FAILURE_MARKER: &str = "Credential verification failed";

/// Marker carried by every schema validation failure message
pub const VALIDATION_FAILURE_MARKER: &str = "validation";

// ── Steps ────────────────────────────────────────────────────────────

/// The pipeline steps, in execution order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStep {
    CredentialGate,
    SchemaValidation,
    Calculation,
    Routing,
    Disclosure,
    CredentialIssuance,
}

impl PipelineStep {
    pub const ORDER: [PipelineStep; 6] = [
        PipelineStep::CredentialGate,
        PipelineStep::SchemaValidation,
        PipelineStep::Calculation,
        PipelineStep::Routing,
        PipelineStep::Disclosure,
        PipelineStep::CredentialIssuance,
    ];

    pub fn number(&self) -> u8 {
        match self {
            Self::CredentialGate => 0,
            Self::SchemaValidation => 1,
            Self::Calculation => 2,
            Self::Routing => 3,
            Self::Disclosure => 4,
            Self::CredentialIssuance => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CredentialGate => "Credential Gate",
            Self::SchemaValidation => "Schema Validation",
            Self::Calculation => "Calculation",
            Self::Routing => "Routing",
            Self::Disclosure => "Disclosure",
            Self::CredentialIssuance => "Credential Issuance",
        }
    }
}

#[derive(Debug)]
enum StepOutcome {
    Completed,
    Skipped(&'static str),
    Halted,
}

/// Mutable state threaded through one run
struct Run<'a> {
    context: &'a ExecutionContext,
    result: ExecutionResult,
    /// Carried-forward data, overlaid with submitted and calculated fields
    scope: DataMap,
}

// ── Processor ────────────────────────────────────────────────────────

/// Runs one action of a blueprint against one submission
pub struct ActionProcessor {
    schema_validator: Arc<dyn SchemaValidator>,
    credential_verifier: Option<Arc<dyn CredentialVerifier>>,
    credential_issuer: Option<Arc<dyn CredentialIssuer>>,
    evaluator: LogicEvaluator,
    routing: RoutingEngine,
    config: ProcessorConfig,
}

impl ActionProcessor {
    pub fn new(schema_validator: Arc<dyn SchemaValidator>) -> Self {
        let evaluator = LogicEvaluator::new();
        Self {
            schema_validator,
            credential_verifier: None,
            credential_issuer: None,
            routing: RoutingEngine::new(evaluator.clone()),
            evaluator,
            config: ProcessorConfig::default(),
        }
    }

    pub fn with_credential_verifier(mut self, verifier: Arc<dyn CredentialVerifier>) -> Self {
        self.credential_verifier = Some(verifier);
        self
    }

    pub fn with_credential_issuer(mut self, issuer: Arc<dyn CredentialIssuer>) -> Self {
        self.credential_issuer = Some(issuer);
        self
    }

    pub fn with_evaluator(mut self, evaluator: LogicEvaluator) -> Self {
        self.routing = RoutingEngine::new(evaluator.clone());
        self.evaluator = evaluator;
        self
    }

    /// Apply engine configuration. A disabled cache switches the processor
    /// to an uncached evaluator.
    pub fn with_config(self, config: EngineConfig) -> Self {
        let evaluator = if config.cache.enabled {
            LogicEvaluator::new()
        } else {
            LogicEvaluator::uncached()
        };
        let mut processor = self.with_evaluator(evaluator);
        processor.config = config.processor;
        processor
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Run the pipeline for one execution context
    pub async fn process(&self, context: &ExecutionContext) -> ExecutionResult {
        let action = &context.action;
        info!(
            blueprint_id = %context.blueprint.id,
            action_id = action.id,
            participant = %context.participant_id,
            "Processing action"
        );

        let mut run = Run {
            context,
            result: ExecutionResult::pending(),
            scope: context.previous_data.clone().unwrap_or_default(),
        };

        for step in PipelineStep::ORDER {
            debug!(step = step.name(), number = step.number(), "Running step");

            let outcome = match step {
                PipelineStep::CredentialGate => self.credential_gate(&mut run).await,
                PipelineStep::SchemaValidation => self.schema_validation(&mut run).await,
                PipelineStep::Calculation => self.calculation(&mut run),
                PipelineStep::Routing => self.route(&mut run),
                PipelineStep::Disclosure => self.disclose(&mut run),
                PipelineStep::CredentialIssuance => self.issue_credential(&mut run).await,
            };

            match outcome {
                StepOutcome::Completed => {
                    debug!(step = step.name(), "Step completed");
                }
                StepOutcome::Skipped(reason) => {
                    debug!(step = step.name(), reason, "Step skipped");
                }
                StepOutcome::Halted => {
                    warn!(
                        step = step.name(),
                        action_id = action.id,
                        errors = ?run.result.errors,
                        "Pipeline halted"
                    );
                    break;
                }
            }
        }

        info!(
            blueprint_id = %context.blueprint.id,
            action_id = action.id,
            success = run.result.success,
            warnings = run.result.warnings.len(),
            "Action processed"
        );
        run.result
    }

    // ── Step 0 ───────────────────────────────────────────────────────

    async fn credential_gate(&self, run: &mut Run<'_>) -> StepOutcome {
        let action = &run.context.action;
        if !action.requires_credentials() {
            return StepOutcome::Skipped("no credential requirements");
        }
        let Some(verifier) = &self.credential_verifier else {
            return StepOutcome::Skipped("no credential verifier configured");
        };

        let verdict = self
            .call(
                "credential verifier",
                verifier.verify(&action.credential_requirements, &run.context.credential_presentations),
            )
            .await;

        match verdict {
            Ok(validation) if validation.is_valid => {
                run.result.credential_validation = Some(validation);
                StepOutcome::Completed
            }
            Ok(validation) => {
                let reasons: Vec<String> = validation
                    .errors
                    .iter()
                    .map(|e| format!("{} ({}): {}", e.requirement_type, e.failure_reason, e.message))
                    .collect();
                run.result
                    .fail(format!("{}: {}", CREDENTIAL_FAILURE_MARKER, reasons.join("; ")));
                run.result.credential_validation = Some(validation);
                StepOutcome::Halted
            }
            Err(e) => {
                run.result.fail(format!("{}: {}", CREDENTIAL_FAILURE_MARKER, e));
                StepOutcome::Halted
            }
        }
    }

    // ── Step 1 ───────────────────────────────────────────────────────

    async fn schema_validation(&self, run: &mut Run<'_>) -> StepOutcome {
        let Some(schema) = run.context.action.schema() else {
            return StepOutcome::Skipped("action has no schema");
        };

        let verdict = self
            .call(
                "schema validator",
                self.schema_validator.validate(&run.context.submitted_data, schema),
            )
            .await;

        match verdict {
            Ok(validation) if validation.is_valid => {
                run.result.validation = validation;
                StepOutcome::Completed
            }
            Ok(validation) => {
                let reasons: Vec<String> = validation.errors.iter().map(ToString::to_string).collect();
                run.result
                    .fail(format!("Schema {} failed: {}", VALIDATION_FAILURE_MARKER, reasons.join("; ")));
                run.result.validation = validation;
                StepOutcome::Halted
            }
            Err(e) => {
                run.result.validation = SchemaValidationResult::invalid(Vec::new());
                run.result
                    .fail(format!("Schema {} failed: {}", VALIDATION_FAILURE_MARKER, e));
                StepOutcome::Halted
            }
        }
    }

    // ── Step 2 ───────────────────────────────────────────────────────

    fn calculation(&self, run: &mut Run<'_>) -> StepOutcome {
        let context = run.context;
        for (name, value) in &context.submitted_data {
            run.scope.insert(name.clone(), value.clone());
        }

        let outcome = self.evaluator.calculate(&run.scope, &context.action.calculations);
        for failure in &outcome.failures {
            warn!(action_id = context.action.id, error = %failure, "Calculation failed");
            run.result.warn(failure.to_string());
        }

        let mut processed = context.submitted_data.clone();
        for (name, value) in &outcome.values {
            processed.insert(name.clone(), value.clone());
            run.scope.insert(name.clone(), value.clone());
        }
        run.result.processed_data = processed;
        run.result.calculated_values = outcome.values;

        if context.action.calculations.is_empty() {
            StepOutcome::Skipped("action has no calculations")
        } else {
            StepOutcome::Completed
        }
    }

    // ── Step 3 ───────────────────────────────────────────────────────

    fn route(&self, run: &mut Run<'_>) -> StepOutcome {
        let context = run.context;
        match self
            .routing
            .determine_next(&context.blueprint, &context.action, &run.scope)
        {
            Ok(routing) => {
                if routing.is_workflow_complete && self.config.warn_on_workflow_complete {
                    run.result.warn(format!(
                        "Workflow complete: action {} has no next step",
                        context.action.id
                    ));
                }
                run.result.routing = Some(routing);
            }
            Err(e) => {
                warn!(action_id = context.action.id, error = %e, "Routing failed");
                run.result.warn(format!("Routing failed: {}", e));
            }
        }
        StepOutcome::Completed
    }

    // ── Step 4 ───────────────────────────────────────────────────────

    fn disclose(&self, run: &mut Run<'_>) -> StepOutcome {
        let disclosures = &run.context.action.disclosures;
        if disclosures.is_empty() {
            if self.config.warn_on_empty_disclosures {
                run.result.warn(format!(
                    "Action {} defines no disclosures; no participant receives data",
                    run.context.action.id
                ));
            }
            return StepOutcome::Skipped("action has no disclosures");
        }
        run.result.disclosures = create_disclosures(&run.result.processed_data, disclosures);
        StepOutcome::Completed
    }

    // ── Step 5 ───────────────────────────────────────────────────────

    async fn issue_credential(&self, run: &mut Run<'_>) -> StepOutcome {
        let context = run.context;
        let Some(config) = &context.action.credential_issuance else {
            return StepOutcome::Skipped("action issues no credential");
        };
        let Some(issuer) = &self.credential_issuer else {
            return StepOutcome::Skipped("no credential issuer configured");
        };
        let Some(signing) = &context.signing_context else {
            return StepOutcome::Skipped("no signing context supplied");
        };

        let issued_at = Utc::now();
        let request = IssuanceRequest {
            credential_type: config.credential_type.clone(),
            claims: map_claims(config, &run.result.processed_data),
            issuer_id: signing.issuer_id.clone(),
            recipient_id: config
                .recipient
                .clone()
                .unwrap_or_else(|| context.wallet_address.clone()),
            signing_key: signing.signing_key.clone(),
            algorithm: signing.algorithm.clone(),
            issued_at,
            expires_at: compute_expiry(
                config.expiry_duration.as_deref(),
                issued_at,
                self.config.default_credential_validity_days,
            ),
            usage_policy: config.usage_policy,
            max_presentations: config.max_presentations,
            display_config: config.display_config.clone(),
        };

        match self.call("credential issuer", issuer.issue(request)).await {
            Ok(issued) => {
                info!(
                    credential_id = %issued.credential_id,
                    credential_type = %issued.credential_type,
                    subject = %issued.subject_id,
                    "Credential issued"
                );
                run.result.issued_credential = Some(issued);
            }
            Err(e) => {
                warn!(action_id = context.action.id, error = %e, "Credential issuance failed");
                run.result.warn(format!("Credential issuance failed: {}", e));
            }
        }
        StepOutcome::Completed
    }

    // ── Collaborator calls ───────────────────────────────────────────

    async fn call<T, F>(&self, collaborator: &'static str, fut: F) -> Result<T, CollaboratorError>
    where
        F: Future<Output = Result<T, CollaboratorError>>,
    {
        match self.config.collaborator_timeout() {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                CollaboratorError::Timeout {
                    collaborator,
                    timeout_ms: limit.as_millis() as u64,
                }
            })?,
            None => fut.await,
        }
    }
}
