use serde::{Deserialize, Serialize};

/// The director task an update runs under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContext {
    pub id: i64,
    pub username: String,
}

impl TaskContext {
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }

    /// Task id as recorded on audit events
    pub fn task_label(&self) -> String {
        self.id.to_string()
    }
}
