//! # Event Model
//!
//! Audit records written around every deployment update. A run writes an
//! opening event when it starts and a closing event, whose `parent_id` points
//! at the opening one, when it finishes.

use crate::constants::DEPLOYMENT_OBJECT_TYPE;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A persisted audit event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub user: String,
    pub action: String,
    pub object_type: String,
    pub object_name: String,
    pub deployment: String,
    pub task: String,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
    pub context: Value,
}

/// An audit event that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub parent_id: Option<i64>,
    pub user: String,
    pub action: String,
    pub object_type: String,
    pub object_name: String,
    pub deployment: String,
    pub task: String,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
    pub context: Value,
}

impl NewEvent {
    /// Event about a deployment, named after it
    pub fn for_deployment(
        deployment: impl Into<String>,
        action: impl Into<String>,
        user: impl Into<String>,
        task: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let deployment = deployment.into();
        Self {
            parent_id: None,
            user: user.into(),
            action: action.into(),
            object_type: DEPLOYMENT_OBJECT_TYPE.to_string(),
            object_name: deployment.clone(),
            deployment,
            task: task.into(),
            timestamp,
            error: None,
            context: Value::Object(Default::default()),
        }
    }

    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    pub fn into_event(self, id: i64) -> Event {
        Event {
            id,
            parent_id: self.parent_id,
            user: self.user,
            action: self.action,
            object_type: self.object_type,
            object_name: self.object_name,
            deployment: self.deployment,
            task: self.task,
            timestamp: self.timestamp,
            error: self.error,
            context: self.context,
        }
    }
}
