pub mod deployment;
pub mod event;
pub mod task;

// Re-export core models for easy access
pub use deployment::{DeploymentRecord, ReleaseVersion, Stemcell, VariableSet};
pub use event::{Event, NewEvent};
pub use task::TaskContext;
