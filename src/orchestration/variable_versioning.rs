//! # Variable Versioning
//!
//! A `deploy=true` run starts a new variable set for the deployment before any
//! model is bound, so every config-server value fetched afterwards is versioned
//! under it. Declared variables are then generated (or left alone when they
//! already hold a value) through the config-server client of the deployment.

use crate::config_server::ConfigServerClientFactory;
use crate::deployment_plan::{DeployOptions, DeploymentPlan};
use crate::error::{DirectorError, Result};
use crate::models::VariableSet;
use crate::persistence::DeploymentRepository;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

pub struct VariableVersioningStage {
    deployments: Arc<dyn DeploymentRepository>,
    client_factory: Arc<dyn ConfigServerClientFactory>,
}

impl VariableVersioningStage {
    pub fn new(
        deployments: Arc<dyn DeploymentRepository>,
        client_factory: Arc<dyn ConfigServerClientFactory>,
    ) -> Self {
        Self {
            deployments,
            client_factory,
        }
    }

    /// Append a variable set stamped `now` when the run deploys.
    ///
    /// Without `deploy` the deployment record is not even looked up.
    pub fn maybe_create_variable_set(
        &self,
        deployment_name: &str,
        options: &DeployOptions,
        now: DateTime<Utc>,
    ) -> Result<Option<VariableSet>> {
        if !options.deploy {
            debug!(deployment = %deployment_name, "Not deploying, keeping current variable set");
            return Ok(None);
        }

        if self.deployments.find_by_name(deployment_name)?.is_none() {
            return Err(DirectorError::DeploymentNotFound(deployment_name.to_string()));
        }

        let variable_set = self.deployments.add_variable_set(deployment_name, now)?;
        info!(
            deployment = %deployment_name,
            variable_set_id = variable_set.id,
            "Created variable set"
        );
        Ok(Some(variable_set))
    }

    /// Generate values for the variables the plan declares
    pub fn resolve_variables(&self, plan: &dyn DeploymentPlan, deployment_name: &str) -> Result<()> {
        let variables = plan.variables();
        if variables.is_empty() {
            return Ok(());
        }

        let client = self.client_factory.create_client(deployment_name);
        debug!(
            deployment = %deployment_name,
            variables = variables.len(),
            config_server_enabled = client.enabled(),
            "Generating variable values"
        );
        client.generate_values(variables, deployment_name)?;
        Ok(())
    }
}
