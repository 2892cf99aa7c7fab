//! # Persistence Interfaces
//!
//! Storage of deployment records and audit events is owned by the host
//! application; the orchestrator only needs the narrow operations below.
//! [`in_memory`] provides thread-safe implementations for embedding and tests.

pub mod in_memory;

use crate::error::Result;
use crate::models::{DeploymentRecord, Event, NewEvent, VariableSet};
use chrono::{DateTime, Utc};

pub use in_memory::{InMemoryDeploymentRepository, InMemoryEventRepository};

pub trait DeploymentRepository: Send + Sync {
    fn find_by_name(&self, name: &str) -> Result<Option<DeploymentRecord>>;

    /// Append a variable set to an existing deployment
    fn add_variable_set(&self, name: &str, created_at: DateTime<Utc>) -> Result<VariableSet>;
}

pub trait EventRepository: Send + Sync {
    /// Persist an event and return it with its assigned id
    fn create(&self, event: NewEvent) -> Result<Event>;
}
