// State machine for deployment update runs
//
// Each orchestration run owns one machine; it only validates ordering and keeps
// the transition history for logging.

pub mod events;
pub mod states;
pub mod update_state_machine;

// Re-export main types for convenient access
pub use events::UpdateEvent;
pub use states::UpdateState;
pub use update_state_machine::{StateTransition, UpdateStateMachine};
