//! Shared doubles for orchestration integration tests.
//!
//! Every double appends to one [`CallLog`] so tests can assert on the order in
//! which the orchestrator talked to its collaborators.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use director_core::clock::FixedClock;
use director_core::config::DirectorConfig;
use director_core::config_server::{
    ConfigServerClient, ConfigServerInterpolator, InMemoryConfigServer, SharedClientFactory,
};
use director_core::deployment_plan::{
    DeployOptions, DeploymentPlan, InstanceGroup, InstanceModel, JobSpec, Lifecycle,
    PlannerFactory, PostDeployRunner, UpdateStep, Variables,
};
use director_core::events::Notifier;
use director_core::locking::InMemoryDeploymentLocks;
use director_core::models::TaskContext;
use director_core::orchestration::{Collaborators, InstancePlan, JobRenderer, UpdateDeployment};
use director_core::persistence::{InMemoryDeploymentRepository, InMemoryEventRepository};
use director_core::{DirectorError, Result};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const DEPLOYMENT_NAME: &str = "deployment-name";
pub const DIRECTOR_NAME: &str = "TestDirector";

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 2, 15, 9, 55, 40).unwrap()
}

/// Ordered record of collaborator calls
#[derive(Debug, Default)]
pub struct CallLog {
    calls: Mutex<Vec<String>>,
}

impl CallLog {
    pub fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Calls made from the controlling thread; per-job renders run concurrently
    pub fn sequential(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| !call.starts_with("render:"))
            .collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.count(prefix) > 0
    }
}

pub struct FakePlan {
    pub name: String,
    pub variables: Variables,
    pub instance_groups: Vec<InstanceGroup>,
    pub bind_error: Option<String>,
    pub log: Arc<CallLog>,
}

impl DeploymentPlan for FakePlan {
    fn name(&self) -> &str {
        &self.name
    }

    fn variables(&self) -> &Variables {
        &self.variables
    }

    fn instance_groups(&self) -> &[InstanceGroup] {
        &self.instance_groups
    }

    fn bind_models(&self) -> Result<()> {
        self.log.record("bind_models");
        match &self.bind_error {
            Some(message) => Err(DirectorError::Planning(message.clone())),
            None => Ok(()),
        }
    }

    fn validate_packages(&self) -> Result<()> {
        self.log.record("validate_packages");
        Ok(())
    }

    fn compile_packages(&self, max_threads: usize) -> Result<()> {
        self.log.record(format!("compile_packages:{max_threads}"));
        Ok(())
    }

    fn instance_models(&self) -> Vec<InstanceModel> {
        self.log.record("instance_models");
        self.instance_groups
            .iter()
            .flat_map(|group| {
                (0..group.instances).map(|index| InstanceModel {
                    instance_group: group.name.clone(),
                    index,
                })
            })
            .collect()
    }
}

pub struct FakePlannerFactory {
    pub plan: Arc<FakePlan>,
    pub log: Arc<CallLog>,
    pub received: Mutex<Option<(Value, Option<i64>, Option<i64>, DeployOptions)>>,
}

impl PlannerFactory for FakePlannerFactory {
    fn create_from_manifest(
        &self,
        manifest: &Value,
        cloud_config_id: Option<i64>,
        runtime_config_id: Option<i64>,
        options: &DeployOptions,
    ) -> Result<Arc<dyn DeploymentPlan>> {
        self.log.record("create_from_manifest");
        *self.received.lock() = Some((manifest.clone(), cloud_config_id, runtime_config_id, *options));
        let plan: Arc<dyn DeploymentPlan> = self.plan.clone();
        Ok(plan)
    }
}

pub struct RecordingRenderer {
    pub log: Arc<CallLog>,
    pub fail_job: Option<String>,
    pub rendered: Mutex<Vec<InstancePlan>>,
}

impl JobRenderer for RecordingRenderer {
    fn render_job(&self, plan: &InstancePlan) -> Result<()> {
        self.log
            .record(format!("render:{}/{}", plan.instance_group, plan.job));
        if self.fail_job.as_deref() == Some(plan.job.as_str()) {
            return Err(DirectorError::Render(format!(
                "Error filling in template 'config.erb' for '{}'",
                plan.job
            )));
        }
        self.rendered.lock().push(plan.clone());
        Ok(())
    }

    fn clean_cache(&self) {
        self.log.record("clean_cache");
    }
}

pub struct RecordingUpdateStep {
    pub log: Arc<CallLog>,
    pub error: Option<String>,
}

impl UpdateStep for RecordingUpdateStep {
    fn perform(&self, _plan: &dyn DeploymentPlan) -> Result<()> {
        self.log.record("update");
        match &self.error {
            Some(message) => Err(DirectorError::Update(message.clone())),
            None => Ok(()),
        }
    }
}

pub struct RecordingPostDeployRunner {
    pub log: Arc<CallLog>,
    pub error: Option<String>,
}

impl PostDeployRunner for RecordingPostDeployRunner {
    fn run_post_deploys(&self, _plan: &dyn DeploymentPlan) -> Result<()> {
        self.log.record("run_post_deploys");
        match &self.error {
            Some(message) => Err(DirectorError::PostDeploy(message.clone())),
            None => Ok(()),
        }
    }
}

pub struct RecordingNotifier {
    pub log: Arc<CallLog>,
}

impl Notifier for RecordingNotifier {
    fn send_start_event(&self, deployment: &str) {
        self.log.record(format!("send_start_event:{deployment}"));
    }

    fn send_end_event(&self, deployment: &str) {
        self.log.record(format!("send_end_event:{deployment}"));
    }

    fn send_error_event(&self, deployment: &str, error: &DirectorError) {
        self.log
            .record(format!("send_error_event:{deployment}:{error}"));
    }
}

/// Default topology: one service group and one errand group
pub fn default_instance_groups() -> Vec<InstanceGroup> {
    vec![
        InstanceGroup::new("web", Lifecycle::Service)
            .with_job(JobSpec::new("nginx", json!({"port": 80}))),
        InstanceGroup::new("some-errand-instance-group", Lifecycle::Errand)
            .with_job(JobSpec::new("smoke_tests", json!({"some-key": "some-value"}))),
    ]
}

/// Wires an [`UpdateDeployment`] to in-memory collaborators and recording doubles
pub struct Harness {
    pub log: Arc<CallLog>,
    pub deployments: Arc<InMemoryDeploymentRepository>,
    pub events: Arc<InMemoryEventRepository>,
    pub locks: Arc<InMemoryDeploymentLocks>,
    pub config_server: Arc<InMemoryConfigServer>,
    pub config: DirectorConfig,
    pub manifest: Value,
    pub task: TaskContext,
    pub variables: Variables,
    pub instance_groups: Vec<InstanceGroup>,
    pub bind_error: Option<String>,
    pub update_error: Option<String>,
    pub post_deploy_error: Option<String>,
    pub render_fail_job: Option<String>,
}

impl Harness {
    pub fn new() -> Self {
        let mut config = DirectorConfig::default();
        config.director.name = DIRECTOR_NAME.to_string();
        config.rendering.max_threads = 4;
        config.compilation.max_threads = 7;
        config.worker_pool.poll_interval_ms = 5;

        Self {
            log: Arc::new(CallLog::default()),
            deployments: Arc::new(InMemoryDeploymentRepository::new()),
            events: Arc::new(InMemoryEventRepository::new()),
            locks: Arc::new(InMemoryDeploymentLocks::new(
                Duration::from_millis(30),
                Duration::from_millis(5),
            )),
            config_server: Arc::new(InMemoryConfigServer::new(DIRECTOR_NAME)),
            config,
            manifest: json!({"name": DEPLOYMENT_NAME}),
            task: TaskContext::new(42, "user"),
            variables: Variables::default(),
            instance_groups: default_instance_groups(),
            bind_error: None,
            update_error: None,
            post_deploy_error: None,
            render_fail_job: None,
        }
    }

    pub fn job(&self, options: DeployOptions) -> UpdateDeployment {
        self.job_with_configs(options, None, None)
    }

    pub fn job_with_configs(
        &self,
        options: DeployOptions,
        cloud_config_id: Option<i64>,
        runtime_config_id: Option<i64>,
    ) -> UpdateDeployment {
        let plan = Arc::new(FakePlan {
            name: DEPLOYMENT_NAME.to_string(),
            variables: self.variables.clone(),
            instance_groups: self.instance_groups.clone(),
            bind_error: self.bind_error.clone(),
            log: Arc::clone(&self.log),
        });
        let client: Arc<dyn ConfigServerClient> = self.config_server.clone();

        let collaborators = Collaborators {
            planner_factory: Arc::new(FakePlannerFactory {
                plan,
                log: Arc::clone(&self.log),
                received: Mutex::new(None),
            }),
            client_factory: Arc::new(SharedClientFactory::new(Arc::clone(&client))),
            interpolator: Arc::new(ConfigServerInterpolator::new(client, DIRECTOR_NAME)),
            job_renderer: Arc::new(RecordingRenderer {
                log: Arc::clone(&self.log),
                fail_job: self.render_fail_job.clone(),
                rendered: Mutex::new(Vec::new()),
            }),
            update_step: Arc::new(RecordingUpdateStep {
                log: Arc::clone(&self.log),
                error: self.update_error.clone(),
            }),
            post_deploy_runner: Arc::new(RecordingPostDeployRunner {
                log: Arc::clone(&self.log),
                error: self.post_deploy_error.clone(),
            }),
            notifier: Arc::new(RecordingNotifier {
                log: Arc::clone(&self.log),
            }),
            deployments: self.deployments.clone(),
            events: self.events.clone(),
            locks: self.locks.clone(),
            clock: Arc::new(FixedClock(fixed_time())),
        };

        UpdateDeployment::new(
            self.manifest.clone(),
            cloud_config_id,
            runtime_config_id,
            options,
            self.task.clone(),
            Arc::new(self.config.clone()),
            collaborators,
        )
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
