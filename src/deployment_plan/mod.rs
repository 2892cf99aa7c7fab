//! # Deployment Plan Interfaces
//!
//! The orchestrator drives collaborators it does not implement: the planner
//! that turns a manifest into a plan, the infrastructure update step and the
//! post-deploy script runner. They are expressed here as traits so the
//! orchestration sequence can be exercised against any implementation.

pub mod instance_group;
pub mod options;

use crate::error::Result;
use serde_json::Value;
use std::sync::Arc;

pub use instance_group::{
    InstanceGroup, InstanceModel, JobSpec, Lifecycle, LinkSpec, VariableSpec, Variables,
};
pub use options::DeployOptions;

/// In-memory model of the desired deployment
pub trait DeploymentPlan: Send + Sync {
    fn name(&self) -> &str;

    fn variables(&self) -> &Variables;

    fn instance_groups(&self) -> &[InstanceGroup];

    fn instance_groups_starting_on_deploy(&self) -> Vec<&InstanceGroup> {
        self.instance_groups()
            .iter()
            .filter(|group| !group.is_errand())
            .collect()
    }

    fn errand_instance_groups(&self) -> Vec<&InstanceGroup> {
        self.instance_groups()
            .iter()
            .filter(|group| group.is_errand())
            .collect()
    }

    /// Bind the plan against current infrastructure state
    fn bind_models(&self) -> Result<()>;

    fn validate_packages(&self) -> Result<()>;

    /// Compile missing packages using at most `max_threads` workers
    fn compile_packages(&self, max_threads: usize) -> Result<()>;

    fn instance_models(&self) -> Vec<InstanceModel>;

    /// Whether any instance group of the final topology changed
    fn did_change(&self) -> bool {
        self.instance_groups().iter().any(InstanceGroup::did_change)
    }
}

/// Builds deployment plans from manifests
pub trait PlannerFactory: Send + Sync {
    fn create_from_manifest(
        &self,
        manifest: &Value,
        cloud_config_id: Option<i64>,
        runtime_config_id: Option<i64>,
        options: &DeployOptions,
    ) -> Result<Arc<dyn DeploymentPlan>>;
}

/// Applies a bound plan to the infrastructure
pub trait UpdateStep: Send + Sync {
    fn perform(&self, plan: &dyn DeploymentPlan) -> Result<()>;
}

/// Runs post-deploy scripts on instances after a topology change
pub trait PostDeployRunner: Send + Sync {
    fn run_post_deploys(&self, plan: &dyn DeploymentPlan) -> Result<()>;
}
