use super::{events::UpdateEvent, states::UpdateState};
use crate::error::{DirectorError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// A recorded state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateTransition {
    pub from: UpdateState,
    pub to: UpdateState,
    pub event: String,
    pub at: DateTime<Utc>,
}

/// Tracks the phase of one deployment update and rejects out-of-order steps
#[derive(Debug, Clone)]
pub struct UpdateStateMachine {
    deployment: String,
    current: UpdateState,
    history: Vec<StateTransition>,
}

impl UpdateStateMachine {
    pub fn new(deployment: impl Into<String>) -> Self {
        Self {
            deployment: deployment.into(),
            current: UpdateState::default(),
            history: Vec::new(),
        }
    }

    pub fn current_state(&self) -> UpdateState {
        self.current
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    /// Attempt to transition the update state
    pub fn transition(&mut self, event: UpdateEvent) -> Result<UpdateState> {
        let target = Self::determine_target_state(self.current, &event)?;

        debug!(
            deployment = %self.deployment,
            from = %self.current,
            to = %target,
            event = event.event_type(),
            error = event.error_message(),
            "Update state transition"
        );

        self.history.push(StateTransition {
            from: self.current,
            to: target,
            event: event.event_type().to_string(),
            at: Utc::now(),
        });
        self.current = target;
        Ok(target)
    }

    /// Determine the target state based on current state and event
    fn determine_target_state(current: UpdateState, event: &UpdateEvent) -> Result<UpdateState> {
        let target = match (current, event) {
            (UpdateState::Start, UpdateEvent::BuildPlan) => UpdateState::PlanBuilt,
            (UpdateState::PlanBuilt, UpdateEvent::VersionVariables) => {
                UpdateState::VariablesVersioned
            }
            (UpdateState::VariablesVersioned, UpdateEvent::BindModels) => UpdateState::ModelsBound,
            (UpdateState::ModelsBound, UpdateEvent::RenderTemplates) => {
                UpdateState::TemplatesRendered
            }

            // Rendering forks into the dry-run exit or the real update
            (UpdateState::TemplatesRendered, UpdateEvent::ExitDryRun) => UpdateState::DryRunExit,
            (UpdateState::TemplatesRendered, UpdateEvent::CompilePackages) => {
                UpdateState::PackagesCompiled
            }
            (UpdateState::PackagesCompiled, UpdateEvent::ApplyUpdate) => UpdateState::Updated,
            (UpdateState::Updated, UpdateEvent::RunPostDeploys) => UpdateState::PostDeployed,

            (UpdateState::DryRunExit | UpdateState::PostDeployed, UpdateEvent::RecordEvents) => {
                UpdateState::EventsRecorded
            }
            (UpdateState::EventsRecorded, UpdateEvent::Finish) => UpdateState::Done,

            (from, UpdateEvent::Fail(_)) if !from.is_terminal() => UpdateState::Failed,

            (from, _) => {
                return Err(DirectorError::StateTransitionError(format!(
                    "cannot apply '{}' in state '{from}'",
                    event.event_type()
                )))
            }
        };

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advance(machine: &mut UpdateStateMachine, events: Vec<UpdateEvent>) {
        for event in events {
            machine.transition(event).unwrap();
        }
    }

    #[test]
    fn test_full_update_lifecycle() {
        let mut machine = UpdateStateMachine::new("deployment-name");
        advance(
            &mut machine,
            vec![
                UpdateEvent::BuildPlan,
                UpdateEvent::VersionVariables,
                UpdateEvent::BindModels,
                UpdateEvent::RenderTemplates,
                UpdateEvent::CompilePackages,
                UpdateEvent::ApplyUpdate,
                UpdateEvent::RunPostDeploys,
                UpdateEvent::RecordEvents,
                UpdateEvent::Finish,
            ],
        );

        assert_eq!(machine.current_state(), UpdateState::Done);
        assert_eq!(machine.history().len(), 9);
        assert_eq!(machine.history()[4].to, UpdateState::PackagesCompiled);
    }

    #[test]
    fn test_dry_run_lifecycle() {
        let mut machine = UpdateStateMachine::new("deployment-name");
        advance(
            &mut machine,
            vec![
                UpdateEvent::BuildPlan,
                UpdateEvent::VersionVariables,
                UpdateEvent::BindModels,
                UpdateEvent::RenderTemplates,
                UpdateEvent::ExitDryRun,
                UpdateEvent::RecordEvents,
                UpdateEvent::Finish,
            ],
        );
        assert_eq!(machine.current_state(), UpdateState::Done);
    }

    #[test]
    fn test_cannot_compile_before_rendering() {
        let mut machine = UpdateStateMachine::new("deployment-name");
        advance(&mut machine, vec![UpdateEvent::BuildPlan]);

        let error = machine.transition(UpdateEvent::CompilePackages).unwrap_err();
        assert!(error.to_string().contains("compile_packages"));
        assert_eq!(machine.current_state(), UpdateState::PlanBuilt);
    }

    #[test]
    fn test_failure_reachable_until_terminal() {
        let mut machine = UpdateStateMachine::new("deployment-name");
        advance(&mut machine, vec![UpdateEvent::BuildPlan]);
        assert_eq!(
            machine.transition(UpdateEvent::Fail("boom".to_string())).unwrap(),
            UpdateState::Failed
        );
        assert!(machine.transition(UpdateEvent::Fail("again".to_string())).is_err());
    }
}
