//! Blueprints: the authored definition of a multi-party workflow
//!
//! A Blueprint is an ordered list of participants and an ordered list of
//! actions. Action `0` is the entry point. Blueprints are treated as
//! immutable configuration for the duration of a run; to change one,
//! author a new version.

use crate::{Action, ActionId, BlueprintError, BlueprintResult, Condition, DataMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── Identifiers ──────────────────────────────────────────────────────

/// Unique identifier for a blueprint
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlueprintId(pub String);

impl BlueprintId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for BlueprintId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Blueprint ────────────────────────────────────────────────────────

/// A complete workflow definition: participants plus ordered actions
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    /// Unique identifier
    pub id: BlueprintId,
    /// Human-readable title
    pub title: String,
    /// Description of what this workflow accomplishes
    #[serde(default)]
    pub description: String,
    /// Version for tracking blueprint evolution
    #[serde(default = "default_version")]
    pub version: u32,
    /// Participants, in declaration order
    #[serde(default)]
    pub participants: Vec<Participant>,
    /// Actions, in declaration order
    #[serde(default)]
    pub actions: Vec<Action>,
    /// When this blueprint was authored
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

fn default_version() -> u32 {
    1
}

impl Blueprint {
    /// Create a new, empty blueprint
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: BlueprintId::generate(),
            title: title.into(),
            description: String::new(),
            version: 1,
            participants: Vec::new(),
            actions: Vec::new(),
            created_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Parse a blueprint from its JSON document form
    pub fn from_json(json: &str) -> BlueprintResult<Self> {
        serde_json::from_str(json).map_err(|e| BlueprintError::Serialization(e.to_string()))
    }

    pub fn to_json(&self) -> BlueprintResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| BlueprintError::Serialization(e.to_string()))
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = BlueprintId::new(id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_participant(mut self, participant: Participant) -> Self {
        self.participants.push(participant);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Get the entry action (id 0)
    pub fn entry_action(&self) -> Option<&Action> {
        self.action(0)
    }

    /// Get an action by id (first declaration wins on duplicates)
    pub fn action(&self, id: ActionId) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == id)
    }

    /// Get a participant by id
    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    /// First action (declaration order) whose sender is the given participant
    pub fn action_for_sender(&self, participant_id: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.sender == participant_id)
    }

    /// Pick the first participant whose routing conditions all hold for `data`.
    ///
    /// The predicate is supplied by the caller so the data model stays free
    /// of any particular expression evaluator. Participants without
    /// conditions never match.
    pub fn select_participant<F>(&self, data: &DataMap, mut matches: F) -> Option<&Participant>
    where
        F: FnMut(&Condition, &DataMap) -> bool,
    {
        self.participants.iter().find(|p| {
            !p.conditions.is_empty() && p.conditions.iter().all(|c| matches(c, data))
        })
    }
}

// ── Participant ──────────────────────────────────────────────────────

/// A named party taking part in a blueprint
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub organisation: String,
    /// Wallet address or other identity token
    #[serde(default)]
    pub wallet_address: String,
    /// Actions this participant may perform
    #[serde(default)]
    pub action_ids: Vec<ActionId>,
    /// Optional routing conditions used to pick a participant from data
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_organisation(mut self, organisation: impl Into<String>) -> Self {
        self.organisation = organisation.into();
        self
    }

    pub fn with_wallet_address(mut self, address: impl Into<String>) -> Self {
        self.wallet_address = address.into();
        self
    }

    pub fn with_action(mut self, action_id: ActionId) -> Self {
        self.action_ids.push(action_id);
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }
}
