//! Error types for the director core.

use crate::config::ConfigurationError;
use crate::config_server::{ConfigServerError, InterpolationError};
use crate::worker_pool::PoolError;
use thiserror::Error;

/// Top-level error surfaced by every orchestration operation.
///
/// Collaborator failures keep their native message so callers see exactly
/// what the planner, update step or renderer reported.
#[derive(Debug, Error)]
pub enum DirectorError {
    #[error("{0}")]
    Planning(String),
    #[error("{0}")]
    Compilation(String),
    #[error("{0}")]
    Update(String),
    #[error("{0}")]
    PostDeploy(String),
    #[error("{0}")]
    Render(String),
    /// Rendered error tree collected during template rendering
    #[error("{0}")]
    RenderAggregate(String),
    #[error(transparent)]
    ConfigServer(#[from] ConfigServerError),
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Deployment '{0}' doesn't exist")]
    DeploymentNotFound(String),
    #[error("Failed to acquire lock for deployment '{deployment}', held by task {holder_task}")]
    DeploymentLocked {
        deployment: String,
        holder_task: String,
    },
    #[error("Persistence error: {0}")]
    PersistenceError(String),
    #[error("State transition error: {0}")]
    StateTransitionError(String),
    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] PoolError),
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl DirectorError {
    /// Short classification used as a structured logging field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Planning(_) => "planning",
            Self::Compilation(_) => "compilation",
            Self::Update(_) => "update",
            Self::PostDeploy(_) => "post_deploy",
            Self::Render(_) => "render",
            Self::RenderAggregate(_) => "render_aggregate",
            Self::ConfigServer(_) => "config_server",
            Self::Interpolation(_) => "interpolation",
            Self::ValidationError(_) => "validation",
            Self::DeploymentNotFound(_) => "deployment_not_found",
            Self::DeploymentLocked { .. } => "deployment_locked",
            Self::PersistenceError(_) => "persistence",
            Self::StateTransitionError(_) => "state_transition",
            Self::WorkerPool(_) => "worker_pool",
            Self::Configuration(_) => "configuration",
        }
    }
}

impl From<serde_json::Error> for DirectorError {
    fn from(error: serde_json::Error) -> Self {
        DirectorError::ValidationError(format!("JSON serialization error: {error}"))
    }
}

pub type Result<T> = std::result::Result<T, DirectorError>;
