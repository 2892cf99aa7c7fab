//! # Update Deployment
//!
//! Drives one deployment update from manifest to audit trail:
//!
//! 1. Open an audit event and take the deployment lock
//! 2. Build the plan, version variables, bind models
//! 3. Render every job template through a worker pool
//! 4. Stop there for a dry run
//! 5. Otherwise notify, compile packages, apply the update, run post-deploy
//!    scripts when the topology changed, notify again, clean the render cache
//! 6. Close the audit event, whatever the outcome
//!
//! A failure at any phase aborts every later phase. The health monitor only
//! hears about failures that happen after it was told the update started.

use super::template_rendering::{JobRenderer, TemplateRenderingStage};
use super::variable_versioning::VariableVersioningStage;
use crate::clock::Clock;
use crate::config::DirectorConfig;
use crate::config_server::{ConfigServerClientFactory, VariablesInterpolator};
use crate::constants::{actions, deployment_path};
use crate::deployment_plan::{
    DeployOptions, DeploymentPlan, PlannerFactory, PostDeployRunner, UpdateStep,
};
use crate::error::{DirectorError, Result};
use crate::events::Notifier;
use crate::locking::DeploymentLock;
use crate::logging::{log_error, log_stage_operation};
use crate::models::{Event, NewEvent, TaskContext};
use crate::persistence::{DeploymentRepository, EventRepository};
use crate::state_machine::{UpdateEvent, UpdateStateMachine};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Everything an update talks to besides its own inputs
#[derive(Clone)]
pub struct Collaborators {
    pub planner_factory: Arc<dyn PlannerFactory>,
    pub client_factory: Arc<dyn ConfigServerClientFactory>,
    pub interpolator: Arc<dyn VariablesInterpolator>,
    pub job_renderer: Arc<dyn JobRenderer>,
    pub update_step: Arc<dyn UpdateStep>,
    pub post_deploy_runner: Arc<dyn PostDeployRunner>,
    pub notifier: Arc<dyn Notifier>,
    pub deployments: Arc<dyn DeploymentRepository>,
    pub events: Arc<dyn EventRepository>,
    pub locks: Arc<dyn DeploymentLock>,
    pub clock: Arc<dyn Clock>,
}

/// A single deployment update run
pub struct UpdateDeployment {
    manifest: Value,
    cloud_config_id: Option<i64>,
    runtime_config_id: Option<i64>,
    options: DeployOptions,
    task: TaskContext,
    config: Arc<DirectorConfig>,
    collaborators: Collaborators,
}

impl UpdateDeployment {
    pub fn new(
        manifest: Value,
        cloud_config_id: Option<i64>,
        runtime_config_id: Option<i64>,
        options: DeployOptions,
        task: TaskContext,
        config: Arc<DirectorConfig>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            manifest,
            cloud_config_id,
            runtime_config_id,
            options,
            task,
            config,
            collaborators,
        }
    }

    pub fn dry_run(&self) -> bool {
        self.options.dry_run
    }

    /// Run the update and return the deployment's resource path
    pub fn perform(&self) -> Result<String> {
        let deployment_name = self.deployment_name()?;
        info!(
            deployment = %deployment_name,
            task_id = self.task.id,
            dry_run = self.options.dry_run,
            "Starting deployment update"
        );

        let opening = self.record_opening_event(&deployment_name)?;
        let mut machine = UpdateStateMachine::new(&deployment_name);
        let mut before = json!({});

        let result = self.run(&deployment_name, &mut machine, &mut before);

        if let Err(error) = &result {
            log_error(
                "update_deployment",
                "perform",
                &error.to_string(),
                Some(&deployment_name),
            );
            if let Err(transition_error) =
                machine.transition(UpdateEvent::Fail(error.to_string()))
            {
                warn!(deployment = %deployment_name, error = %transition_error, "Unable to mark update as failed");
            }
        }

        let after = self.deployment_context(&deployment_name).unwrap_or_else(|error| {
            warn!(deployment = %deployment_name, error = %error, "Unable to read deployment for audit context");
            json!({})
        });
        let closing = self.record_closing_event(
            &deployment_name,
            &opening,
            json!({ "before": before, "after": after }),
            result.as_ref().err(),
        );

        match (result, closing) {
            (Ok(path), Ok(())) => {
                self.advance(&mut machine, &deployment_name, UpdateEvent::RecordEvents)?;
                self.advance(&mut machine, &deployment_name, UpdateEvent::Finish)?;
                Ok(path)
            }
            (Ok(_), Err(error)) => Err(error),
            (Err(error), Ok(())) => Err(error),
            (Err(error), Err(closing_error)) => {
                warn!(deployment = %deployment_name, error = %closing_error, "Unable to record closing event");
                Err(error)
            }
        }
    }

    fn run(
        &self,
        deployment_name: &str,
        machine: &mut UpdateStateMachine,
        before: &mut Value,
    ) -> Result<String> {
        let _lock = self
            .collaborators
            .locks
            .acquire(deployment_name, self.task.id)?;
        *before = self.deployment_context(deployment_name)?;

        let plan = self.collaborators.planner_factory.create_from_manifest(
            &self.manifest,
            self.cloud_config_id,
            self.runtime_config_id,
            &self.options,
        )?;
        self.advance(machine, deployment_name, UpdateEvent::BuildPlan)?;

        let versioning = VariableVersioningStage::new(
            Arc::clone(&self.collaborators.deployments),
            Arc::clone(&self.collaborators.client_factory),
        );
        versioning.maybe_create_variable_set(
            plan.name(),
            &self.options,
            self.collaborators.clock.now(),
        )?;
        versioning.resolve_variables(plan.as_ref(), plan.name())?;
        self.advance(machine, deployment_name, UpdateEvent::VersionVariables)?;

        plan.bind_models()?;
        plan.validate_packages()?;
        self.advance(machine, deployment_name, UpdateEvent::BindModels)?;

        let rendering = TemplateRenderingStage::new(
            Arc::clone(&self.collaborators.interpolator),
            Arc::clone(&self.collaborators.job_renderer),
            self.config.rendering.max_threads,
            self.config.worker_pool.poll_interval(),
        );
        rendering.render_all(
            plan.name(),
            &plan.instance_groups_starting_on_deploy(),
            &plan.errand_instance_groups(),
        )?;
        self.advance(machine, deployment_name, UpdateEvent::RenderTemplates)?;

        if self.dry_run() {
            self.advance(machine, deployment_name, UpdateEvent::ExitDryRun)?;
            self.collaborators.job_renderer.clean_cache();
            return Ok(deployment_path(deployment_name));
        }

        let notifier = &self.collaborators.notifier;
        notifier.send_start_event(deployment_name);
        let outcome = self.apply(plan.as_ref(), deployment_name, machine);
        if let Err(error) = &outcome {
            notifier.send_error_event(deployment_name, error);
        }
        outcome
    }

    /// Phases that change infrastructure; only reached outside dry runs
    fn apply(
        &self,
        plan: &dyn DeploymentPlan,
        deployment_name: &str,
        machine: &mut UpdateStateMachine,
    ) -> Result<String> {
        plan.compile_packages(self.config.compilation.max_threads)?;
        self.advance(machine, deployment_name, UpdateEvent::CompilePackages)?;

        let instances = plan.instance_models();
        info!(
            deployment = %deployment_name,
            instances = instances.len(),
            "Applying deployment plan"
        );
        self.collaborators.update_step.perform(plan)?;
        self.advance(machine, deployment_name, UpdateEvent::ApplyUpdate)?;

        if plan.did_change() {
            self.collaborators.post_deploy_runner.run_post_deploys(plan)?;
        } else {
            info!(deployment = %deployment_name, "No instance group changed, skipping post-deploy scripts");
        }
        self.advance(machine, deployment_name, UpdateEvent::RunPostDeploys)?;

        self.collaborators.notifier.send_end_event(deployment_name);
        self.collaborators.job_renderer.clean_cache();

        Ok(deployment_path(deployment_name))
    }

    fn deployment_name(&self) -> Result<String> {
        self.manifest
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                DirectorError::ValidationError("deployment manifest must have a 'name'".to_string())
            })
    }

    fn action(&self) -> &'static str {
        if self.options.new {
            actions::CREATE
        } else {
            actions::UPDATE
        }
    }

    fn advance(
        &self,
        machine: &mut UpdateStateMachine,
        deployment_name: &str,
        event: UpdateEvent,
    ) -> Result<()> {
        let stage = event.event_type();
        let state = machine.transition(event)?;
        log_stage_operation(
            deployment_name,
            self.task.id,
            stage,
            "complete",
            Some(&state.to_string()),
        );
        Ok(())
    }

    /// Releases and stemcells currently recorded for the deployment
    fn deployment_context(&self, deployment_name: &str) -> Result<Value> {
        Ok(
            match self.collaborators.deployments.find_by_name(deployment_name)? {
                Some(record) => json!({
                    "releases": record.release_labels(),
                    "stemcells": record.stemcell_labels(),
                }),
                None => json!({}),
            },
        )
    }

    fn new_event(&self, deployment_name: &str) -> NewEvent {
        NewEvent::for_deployment(
            deployment_name,
            self.action(),
            &self.task.username,
            self.task.task_label(),
            self.collaborators.clock.now(),
        )
    }

    fn record_opening_event(&self, deployment_name: &str) -> Result<Event> {
        self.collaborators.events.create(self.new_event(deployment_name))
    }

    fn record_closing_event(
        &self,
        deployment_name: &str,
        opening: &Event,
        context: Value,
        error: Option<&DirectorError>,
    ) -> Result<()> {
        let event = self
            .new_event(deployment_name)
            .with_parent(opening.id)
            .with_context(context)
            .with_error(error.map(ToString::to_string));
        self.collaborators.events.create(event)?;
        Ok(())
    }
}
