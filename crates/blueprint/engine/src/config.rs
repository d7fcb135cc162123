//! Engine configuration

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level engine configuration, loadable from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub processor: ProcessorConfig,
    pub cache: CacheConfig,
}

/// Action processor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Deadline for each schema/credential collaborator call. No deadline
    /// when unset.
    pub collaborator_timeout_ms: Option<u64>,

    /// Credential validity used when an issuance duration cannot be parsed
    pub default_credential_validity_days: i64,

    /// Add a warning to the result when routing completes the workflow
    pub warn_on_workflow_complete: bool,

    /// Add a warning to the result when an action defines no disclosures
    pub warn_on_empty_disclosures: bool,
}

impl ProcessorConfig {
    pub fn collaborator_timeout(&self) -> Option<Duration> {
        self.collaborator_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            collaborator_timeout_ms: None,
            default_credential_validity_days: 365,
            warn_on_workflow_complete: true,
            warn_on_empty_disclosures: true,
        }
    }
}

/// Compiled-expression cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Share compiled expressions through the process-wide cache
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl EngineConfig {
    /// Parse configuration from a TOML document
    pub fn from_toml_str(contents: &str) -> EngineResult<Self> {
        toml::from_str(contents).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Load configuration from file. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> EngineResult<String> {
        toml::to_string(self).map_err(|e| EngineError::Config(e.to_string()))
    }
}
