//! # Template Rendering Stage
//!
//! Interpolates and renders every job of the deployment in parallel. Each
//! (instance group, job) pair is one unit of work on a scoped
//! [`WorkerPool`]; ordinary instance groups are submitted first, then errands.
//!
//! Interpolation and render failures do not stop the stage: they are recorded
//! in a shared [`ErrorAggregator`] so the user sees all of them at once. Only
//! unexpected failures of a unit (a panic, for instance) go through the pool's
//! first-failure channel, which also stops further submission.

use super::error_aggregator::ErrorAggregator;
use crate::config_server::VariablesInterpolator;
use crate::deployment_plan::{InstanceGroup, JobSpec, LinkSpec};
use crate::error::{DirectorError, Result};
use crate::worker_pool::WorkerPool;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A job with its properties and consumed links fully interpolated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstancePlan {
    pub deployment: String,
    pub instance_group: String,
    pub job: String,
    pub properties: Value,
    pub links: Vec<LinkSpec>,
}

/// Low-level renderer of job templates
pub trait JobRenderer: Send + Sync {
    fn render_job(&self, plan: &InstancePlan) -> Result<()>;

    /// Drop cached template blobs once a deploy has finished
    fn clean_cache(&self);
}

pub struct TemplateRenderingStage {
    interpolator: Arc<dyn VariablesInterpolator>,
    renderer: Arc<dyn JobRenderer>,
    max_threads: usize,
    poll_interval: Duration,
}

struct RenderUnit {
    deployment: String,
    instance_group: String,
    job: JobSpec,
}

impl TemplateRenderingStage {
    pub fn new(
        interpolator: Arc<dyn VariablesInterpolator>,
        renderer: Arc<dyn JobRenderer>,
        max_threads: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            interpolator,
            renderer,
            max_threads,
            poll_interval,
        }
    }

    /// Render every job of `instance_groups`, then of `errand_instance_groups`.
    ///
    /// Returns one aggregated error covering every failed job.
    pub fn render_all(
        &self,
        deployment_name: &str,
        instance_groups: &[&InstanceGroup],
        errand_instance_groups: &[&InstanceGroup],
    ) -> Result<()> {
        let units: Vec<RenderUnit> = instance_groups
            .iter()
            .chain(errand_instance_groups.iter())
            .flat_map(|group| {
                group.jobs.iter().map(|job| RenderUnit {
                    deployment: deployment_name.to_string(),
                    instance_group: group.name.clone(),
                    job: job.clone(),
                })
            })
            .collect();

        info!(
            deployment = %deployment_name,
            instance_groups = instance_groups.len(),
            errand_instance_groups = errand_instance_groups.len(),
            jobs = units.len(),
            max_threads = self.max_threads,
            "Rendering job templates"
        );

        if units.is_empty() {
            return Ok(());
        }

        let errors = Arc::new(Mutex::new(ErrorAggregator::new()));
        let pool: WorkerPool<DirectorError> =
            WorkerPool::new("render_templates", self.max_threads)?
                .with_poll_interval(self.poll_interval);

        let pool_result = pool.run_scoped(|pool| {
            for unit in units {
                if pool.has_failed() {
                    debug!(deployment = %deployment_name, "Rendering failed, not submitting remaining jobs");
                    break;
                }

                // Branch order follows submission order, not completion order
                {
                    let mut errors = errors.lock();
                    errors.declare_job(&unit.instance_group, &unit.job.name);
                    for link in &unit.job.links {
                        errors.declare_link(
                            &unit.instance_group,
                            &unit.job.name,
                            &link.name,
                            &link.provider_deployment,
                        );
                    }
                }

                let interpolator = Arc::clone(&self.interpolator);
                let renderer = Arc::clone(&self.renderer);
                let errors = Arc::clone(&errors);
                pool.submit(move || {
                    render_unit(&unit, interpolator.as_ref(), renderer.as_ref(), &errors);
                    Ok(())
                })?;
            }
            Ok(())
        });

        let aggregator = std::mem::take(&mut *errors.lock());
        if let Some(error) = aggregator.into_error() {
            return Err(error);
        }
        pool_result
    }
}

fn render_unit(
    unit: &RenderUnit,
    interpolator: &dyn VariablesInterpolator,
    renderer: &dyn JobRenderer,
    errors: &Mutex<ErrorAggregator>,
) {
    let group = unit.instance_group.as_str();
    let job = unit.job.name.as_str();
    debug!(deployment = %unit.deployment, instance_group = group, job, "Rendering job");

    let mut failed = false;
    let properties = match interpolator
        .interpolate_template_spec_properties(&unit.job.properties, &unit.deployment)
    {
        Ok(properties) => properties,
        Err(error) => {
            failed = true;
            let mut errors = errors.lock();
            for message in error.into_messages() {
                errors.record_job_failure(group, job, message);
            }
            Value::Null
        }
    };

    let mut links = Vec::with_capacity(unit.job.links.len());
    for link in &unit.job.links {
        match interpolator.interpolate_link_spec_properties(link) {
            Ok(properties) => links.push(LinkSpec {
                properties,
                ..link.clone()
            }),
            Err(error) => {
                failed = true;
                let mut errors = errors.lock();
                for message in error.into_messages() {
                    errors.record_link_failure(
                        group,
                        job,
                        &link.name,
                        &link.provider_deployment,
                        message,
                    );
                }
            }
        }
    }

    if failed {
        return;
    }

    let plan = InstancePlan {
        deployment: unit.deployment.clone(),
        instance_group: group.to_string(),
        job: job.to_string(),
        properties,
        links,
    };
    if let Err(error) = renderer.render_job(&plan) {
        errors.lock().record_job_failure(group, job, error.to_string());
    }
}
