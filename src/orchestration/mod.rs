//! # Orchestration Engine
//!
//! Sequencing of a deployment update and the stages it is built from.
//!
//! ## Core Components
//!
//! - **UpdateDeployment**: runs one update end to end, including the dry-run
//!   short-circuit, health-monitor notifications and the audit trail
//! - **VariableVersioningStage**: variable-set creation and config-server
//!   value generation
//! - **TemplateRenderingStage**: per-job interpolation and rendering fanned out
//!   through a [`WorkerPool`](crate::worker_pool::WorkerPool)
//! - **ErrorAggregator**: collects rendering failures into one nested report

pub mod error_aggregator;
pub mod template_rendering;
pub mod update_deployment;
pub mod variable_versioning;

// Re-export core types and components for easy access
pub use error_aggregator::{ErrorAggregator, ErrorNode};
pub use template_rendering::{InstancePlan, JobRenderer, TemplateRenderingStage};
pub use update_deployment::{Collaborators, UpdateDeployment};
pub use variable_versioning::VariableVersioningStage;
