//! Deploy options passed along with the manifest.

use crate::constants::options;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Flags controlling a single update run; absent keys are `false`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployOptions {
    /// Create a new variable set before binding models
    pub deploy: bool,
    /// Validate and render only
    pub dry_run: bool,
    /// The deployment is being created rather than updated
    pub new: bool,
}

impl DeployOptions {
    /// Parse the options map supplied with a deploy request
    pub fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            (options::DEPLOY): self.deploy,
            (options::DRY_RUN): self.dry_run,
            (options::NEW): self.new,
        })
    }
}
