use serde::{Deserialize, Serialize};

/// Events that advance a deployment update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum UpdateEvent {
    BuildPlan,
    VersionVariables,
    BindModels,
    RenderTemplates,
    ExitDryRun,
    CompilePackages,
    ApplyUpdate,
    RunPostDeploys,
    RecordEvents,
    Finish,
    /// Abort the run with an error message
    Fail(String),
}

impl UpdateEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::BuildPlan => "build_plan",
            Self::VersionVariables => "version_variables",
            Self::BindModels => "bind_models",
            Self::RenderTemplates => "render_templates",
            Self::ExitDryRun => "exit_dry_run",
            Self::CompilePackages => "compile_packages",
            Self::ApplyUpdate => "apply_update",
            Self::RunPostDeploys => "run_post_deploys",
            Self::RecordEvents => "record_events",
            Self::Finish => "finish",
            Self::Fail(_) => "fail",
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(message) => Some(message),
            _ => None,
        }
    }
}
