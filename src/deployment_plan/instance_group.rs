//! Instance groups, their jobs and resolved links as seen by the orchestrator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether an instance group keeps running or is run on demand
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Service,
    Errand,
}

/// A named set of homogeneous instances within a deployment plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceGroup {
    pub name: String,
    #[serde(default)]
    pub lifecycle: Lifecycle,
    #[serde(default)]
    pub instances: usize,
    #[serde(default)]
    pub jobs: Vec<JobSpec>,
    /// Set by model binding when any instance of the group will change
    #[serde(default)]
    pub changed: bool,
}

impl InstanceGroup {
    pub fn new(name: impl Into<String>, lifecycle: Lifecycle) -> Self {
        Self {
            name: name.into(),
            lifecycle,
            ..Self::default()
        }
    }

    pub fn with_job(mut self, job: JobSpec) -> Self {
        self.jobs.push(job);
        self
    }

    pub fn is_errand(&self) -> bool {
        self.lifecycle == Lifecycle::Errand
    }

    pub fn did_change(&self) -> bool {
        self.changed
    }
}

/// A release job placed on an instance group, with raw (uninterpolated) properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    #[serde(default)]
    pub properties: Value,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

impl JobSpec {
    pub fn new(name: impl Into<String>, properties: Value) -> Self {
        Self {
            name: name.into(),
            properties,
            links: Vec::new(),
        }
    }

    pub fn with_link(mut self, link: LinkSpec) -> Self {
        self.links.push(link);
        self
    }
}

/// A link consumed by a job, resolved against its providing deployment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub name: String,
    pub provider_deployment: String,
    #[serde(default)]
    pub properties: Value,
}

impl LinkSpec {
    pub fn new(
        name: impl Into<String>,
        provider_deployment: impl Into<String>,
        properties: Value,
    ) -> Self {
        Self {
            name: name.into(),
            provider_deployment: provider_deployment.into(),
            properties,
        }
    }
}

/// A variable declared by the deployment manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub options: Value,
}

impl VariableSpec {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            options: Value::Null,
        }
    }
}

/// Variables declared by a deployment plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variables(Vec<VariableSpec>);

impl Variables {
    pub fn new(specs: Vec<VariableSpec>) -> Self {
        Self(specs)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariableSpec> {
        self.0.iter()
    }
}

/// A concrete instance of an instance group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceModel {
    pub instance_group: String,
    pub index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_instance_group_deserializes_with_defaults() {
        let group: InstanceGroup = serde_json::from_value(json!({
            "name": "web",
            "jobs": [{"name": "nginx", "properties": {"port": 80}}]
        }))
        .unwrap();

        assert_eq!(group.lifecycle, Lifecycle::Service);
        assert!(!group.did_change());
        assert_eq!(group.jobs[0].properties["port"], 80);
        assert!(group.jobs[0].links.is_empty());
    }

    #[test]
    fn test_variables_use_manifest_type_key() {
        let variables: Variables = serde_json::from_value(json!([
            {"name": "placeholder_a", "type": "password"}
        ]))
        .unwrap();

        assert_eq!(variables.len(), 1);
        assert_eq!(variables.iter().next().unwrap().kind, "password");
    }
}
