use serde::{Deserialize, Serialize};
use std::fmt;

/// Phases of a deployment update run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateState {
    /// Lock acquired, nothing done yet
    #[default]
    Start,
    PlanBuilt,
    VariablesVersioned,
    ModelsBound,
    TemplatesRendered,
    /// Dry run stopped after rendering
    DryRunExit,
    PackagesCompiled,
    Updated,
    /// Post-deploy hooks ran or were not needed
    PostDeployed,
    EventsRecorded,
    Done,
    Failed,
}

impl UpdateState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::PlanBuilt => "plan_built",
            Self::VariablesVersioned => "variables_versioned",
            Self::ModelsBound => "models_bound",
            Self::TemplatesRendered => "templates_rendered",
            Self::DryRunExit => "dry_run_exit",
            Self::PackagesCompiled => "packages_compiled",
            Self::Updated => "updated",
            Self::PostDeployed => "post_deployed",
            Self::EventsRecorded => "events_recorded",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for UpdateState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "plan_built" => Ok(Self::PlanBuilt),
            "variables_versioned" => Ok(Self::VariablesVersioned),
            "models_bound" => Ok(Self::ModelsBound),
            "templates_rendered" => Ok(Self::TemplatesRendered),
            "dry_run_exit" => Ok(Self::DryRunExit),
            "packages_compiled" => Ok(Self::PackagesCompiled),
            "updated" => Ok(Self::Updated),
            "post_deployed" => Ok(Self::PostDeployed),
            "events_recorded" => Ok(Self::EventsRecorded),
            "done" => Ok(Self::Done),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid update state: {s}")),
        }
    }
}
