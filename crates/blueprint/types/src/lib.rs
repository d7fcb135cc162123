//! Blueprint domain types
//!
//! A blueprint is a declaratively authored, multi-party workflow: an
//! ordered list of participants and an ordered list of actions. Each
//! action may validate submitted data, derive calculated fields, route to
//! the next participant(s), disclose subsets of the data, and gate entry
//! or exit on verifiable credentials.
//!
//! This crate only carries data. Evaluation lives in `blueprint-logic`,
//! execution and static validation in `blueprint-engine`.
//!
//! # Example
//!
//! ```rust
//! use blueprint_types::*;
//!
//! let blueprint = Blueprint::new("Purchase Order")
//!     .with_participant(Participant::new("buyer", "Buyer"))
//!     .with_participant(Participant::new("seller", "Seller"))
//!     .with_action(
//!         Action::new(0, "Submit Order", "buyer")
//!             .with_route(Route::default_route("to-seller", vec![1]))
//!             .with_disclosure(Disclosure::new("seller", ["/orderId"])),
//!     )
//!     .with_action(Action::new(1, "Confirm Order", "seller"));
//!
//! assert!(blueprint.entry_action().is_some());
//! assert_eq!(blueprint.action_for_sender("seller").unwrap().id, 1);
//! ```

#![deny(unsafe_code)]

pub mod action;
pub mod blueprint;
pub mod credential;
pub mod error;
pub mod execution;
pub mod routing;

pub use action::{
    is_always_criterion, Action, ActionId, Condition, Disclosure, Form, Route, ALWAYS_CRITERION,
};
pub use blueprint::{Blueprint, BlueprintId, Participant};
pub use credential::{
    ClaimConstraint, ClaimMapping, CredentialFailureReason, CredentialIssuanceConfig,
    CredentialPresentation, CredentialRequirement, CredentialValidationError,
    CredentialValidationResult, IssuanceSigningContext, IssuedCredentialInfo, UsagePolicy,
    VerifiedCredential,
};
pub use error::{BlueprintError, BlueprintResult};
pub use execution::{
    DisclosureResult, ExecutionContext, ExecutionResult, SchemaValidationError,
    SchemaValidationResult,
};
pub use routing::{RoutedAction, RoutingResult};

/// Field name → value mapping used for submitted, calculated and disclosed data
pub type DataMap = serde_json::Map<String, serde_json::Value>;
