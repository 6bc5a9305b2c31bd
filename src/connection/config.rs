use crate::core::{DbError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROVENANCE: &str = "allocdb";
pub const DEFAULT_SYSTEM_ACTOR: &str = "admin";

/// Audit settings applied to rows the engine writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// Provenance tag stamped on inserted allocation rows
    pub default_provenance: String,

    /// Actor recorded for inserts the engine performs on its own behalf
    pub system_actor_label: String,
}

impl AllocationConfig {
    pub fn new() -> Self {
        Self {
            default_provenance: DEFAULT_PROVENANCE.to_string(),
            system_actor_label: DEFAULT_SYSTEM_ACTOR.to_string(),
        }
    }

    pub fn default_provenance(mut self, provenance: &str) -> Self {
        self.default_provenance = provenance.to_string();
        self
    }

    pub fn system_actor_label(mut self, actor: &str) -> Self {
        self.system_actor_label = actor.to_string();
        self
    }

    /// Parse from JSON; missing fields take their defaults.
    ///
    /// ```ignore
    /// let config = AllocationConfig::from_json(r#"{"default_provenance": "import"}"#)?;
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DbError::InvalidArgument(format!("Invalid allocation config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_provenance.trim().is_empty() {
            return Err(DbError::InvalidArgument(
                "default_provenance cannot be empty".into(),
            ));
        }
        if self.system_actor_label.trim().is_empty() {
            return Err(DbError::InvalidArgument(
                "system_actor_label cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self::new()
    }
}
