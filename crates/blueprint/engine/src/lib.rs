//! Blueprint Engine - executes and validates multi-party workflows
//!
//! The engine runs one action of a [`Blueprint`](blueprint_types::Blueprint)
//! at a time through a fixed pipeline:
//!
//! ```text
//! credential gate → schema validation → calculation → routing → disclosure → credential issuance
//! ```
//!
//! The first two steps can halt a run; the rest only add warnings.
//! Schema validation and credential verification/issuance are pluggable
//! collaborators behind async traits, so the core stays free of I/O.
//!
//! Independently of execution, [`GraphValidator`] checks at authoring time
//! that a blueprint's action graph has an entry point, reachable actions,
//! valid targets and no cycles.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use blueprint_engine::{mocks::MockSchemaValidator, ActionProcessor};
//! use blueprint_types::{Action, Blueprint, ExecutionContext};
//!
//! let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! let action = Action::new(0, "Submit", "buyer");
//! let blueprint = Arc::new(Blueprint::new("purchase").with_action(action.clone()));
//! let processor = ActionProcessor::new(Arc::new(MockSchemaValidator::new()));
//!
//! let context = ExecutionContext::new(blueprint, action, Default::default());
//! let result = rt.block_on(processor.process(&context));
//! assert!(result.success);
//! assert!(result.is_workflow_complete());
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod credentials;
pub mod disclosure;
pub mod error;
pub mod graph;
pub mod mocks;
pub mod processor;
pub mod routing;
pub mod traits;

pub use config::{CacheConfig, EngineConfig, ProcessorConfig};
pub use credentials::{compute_expiry, map_claims, parse_iso8601_duration, RequirementMatcher};
pub use disclosure::{apply_disclosure, create_disclosures, DataPointer};
pub use error::{CollaboratorError, EngineError, EngineResult};
pub use graph::{GraphIssue, GraphValidationReport, GraphValidator};
pub use processor::{
    ActionProcessor, PipelineStep, CREDENTIAL_FAILURE_MARKER, VALIDATION_FAILURE_MARKER,
};
pub use routing::RoutingEngine;
pub use traits::{CredentialIssuer, CredentialVerifier, IssuanceRequest, SchemaValidator};
