//! Process-local repositories guarded by `parking_lot` locks.

use super::{DeploymentRepository, EventRepository};
use crate::error::{DirectorError, Result};
use crate::models::{DeploymentRecord, Event, NewEvent, VariableSet};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct InMemoryDeploymentRepository {
    deployments: RwLock<HashMap<String, DeploymentRecord>>,
    next_variable_set_id: Mutex<i64>,
}

impl InMemoryDeploymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a deployment record
    pub fn save(&self, record: DeploymentRecord) {
        self.deployments.write().insert(record.name.clone(), record);
    }
}

impl DeploymentRepository for InMemoryDeploymentRepository {
    fn find_by_name(&self, name: &str) -> Result<Option<DeploymentRecord>> {
        Ok(self.deployments.read().get(name).cloned())
    }

    fn add_variable_set(&self, name: &str, created_at: DateTime<Utc>) -> Result<VariableSet> {
        let mut deployments = self.deployments.write();
        let record = deployments
            .get_mut(name)
            .ok_or_else(|| DirectorError::DeploymentNotFound(name.to_string()))?;

        let id = {
            let mut next_id = self.next_variable_set_id.lock();
            *next_id += 1;
            *next_id
        };
        let variable_set = VariableSet {
            id,
            deployment: name.to_string(),
            created_at,
        };
        record.variable_sets.push(variable_set.clone());
        Ok(variable_set)
    }
}

/// Event log assigning sequential ids starting at 1
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    events: Mutex<Vec<Event>>,
}

impl InMemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events in insertion (id) order
    pub fn all(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }
}

impl EventRepository for InMemoryEventRepository {
    fn create(&self, event: NewEvent) -> Result<Event> {
        let mut events = self.events.lock();
        let id = i64::try_from(events.len())
            .map_err(|_| DirectorError::PersistenceError("event id overflow".to_string()))?
            + 1;
        let event = event.into_event(id);
        events.push(event.clone());
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_add_variable_set_requires_existing_deployment() {
        let repository = InMemoryDeploymentRepository::new();
        let now = Utc.with_ymd_and_hms(2016, 2, 15, 9, 55, 40).unwrap();

        let error = repository.add_variable_set("missing", now).unwrap_err();
        assert!(matches!(error, DirectorError::DeploymentNotFound(ref name) if name == "missing"));
    }

    #[test]
    fn test_add_variable_set_appends_to_record() {
        let repository = InMemoryDeploymentRepository::new();
        repository.save(DeploymentRecord::new("deployment-name"));
        let now = Utc.with_ymd_and_hms(2016, 2, 15, 9, 55, 40).unwrap();

        let first = repository.add_variable_set("deployment-name", now).unwrap();
        let second = repository.add_variable_set("deployment-name", now).unwrap();

        let record = repository.find_by_name("deployment-name").unwrap().unwrap();
        assert_eq!(record.variable_sets, vec![first.clone(), second.clone()]);
        assert_eq!(first.created_at, now);
        assert!(second.id > first.id);
    }

    #[test]
    fn test_events_get_sequential_ids() {
        let repository = InMemoryEventRepository::new();
        let now = Utc.with_ymd_and_hms(2016, 2, 15, 9, 55, 40).unwrap();

        let opening = repository
            .create(NewEvent::for_deployment("deployment-name", "update", "user", "42", now))
            .unwrap();
        let closing = repository
            .create(
                NewEvent::for_deployment("deployment-name", "update", "user", "42", now)
                    .with_parent(opening.id),
            )
            .unwrap();

        assert_eq!(opening.id, 1);
        assert_eq!(closing.parent_id, Some(1));
        assert_eq!(repository.count(), 2);
    }
}
