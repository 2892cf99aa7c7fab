//! # Deployment Model
//!
//! The persisted view of a deployment the orchestrator reads and mutates:
//! its variable sets and the releases and stemcells it currently uses.
//!
//! ## Variable Sets
//!
//! A variable set marks a versioning boundary for config-server values. The
//! orchestrator appends one per `deploy=true` run, before models are bound, so
//! every value fetched afterwards belongs to the new set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Versioned snapshot boundary for resolved variables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSet {
    pub id: i64,
    pub deployment: String,
    pub created_at: DateTime<Utc>,
}

/// A release version used by a deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseVersion {
    pub name: String,
    pub version: String,
}

impl ReleaseVersion {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

/// A stemcell used by a deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stemcell {
    pub name: String,
    pub version: String,
}

impl Stemcell {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for Stemcell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub name: String,
    #[serde(default)]
    pub variable_sets: Vec<VariableSet>,
    #[serde(default)]
    pub releases: Vec<ReleaseVersion>,
    #[serde(default)]
    pub stemcells: Vec<Stemcell>,
}

impl DeploymentRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variable_sets: Vec::new(),
            releases: Vec::new(),
            stemcells: Vec::new(),
        }
    }

    /// Most recently created variable set
    pub fn current_variable_set(&self) -> Option<&VariableSet> {
        self.variable_sets.iter().max_by_key(|set| (set.created_at, set.id))
    }

    /// `name/version` labels of the releases in use
    pub fn release_labels(&self) -> Vec<String> {
        self.releases.iter().map(ToString::to_string).collect()
    }

    /// `name/version` labels of the stemcells in use
    pub fn stemcell_labels(&self) -> Vec<String> {
        self.stemcells.iter().map(ToString::to_string).collect()
    }
}
