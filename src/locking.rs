//! # Deployment Locks
//!
//! Only one update may run per deployment name. A lock is held for the
//! lifetime of a [`DeploymentLockGuard`] and released when the guard drops,
//! whichever way the run ends.

use crate::config::LockingConfig;
use crate::error::{DirectorError, Result};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

/// Grants exclusive per-deployment access
pub trait DeploymentLock: Send + Sync {
    fn acquire(&self, deployment_name: &str, task_id: i64) -> Result<DeploymentLockGuard>;
}

/// Releases its lock on drop
pub struct DeploymentLockGuard {
    deployment: String,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl DeploymentLockGuard {
    pub fn new(deployment: impl Into<String>, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            deployment: deployment.into(),
            release: Some(Box::new(release)),
        }
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }
}

impl fmt::Debug for DeploymentLockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentLockGuard")
            .field("deployment", &self.deployment)
            .finish()
    }
}

impl Drop for DeploymentLockGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            debug!(deployment = %self.deployment, "Released deployment lock");
        }
    }
}

#[derive(Debug, Clone)]
pub struct LockHolder {
    pub uid: Uuid,
    pub task_id: i64,
    pub acquired_at: DateTime<Utc>,
}

/// Lock table shared by every orchestration in the process
#[derive(Debug, Clone)]
pub struct InMemoryDeploymentLocks {
    holders: Arc<DashMap<String, LockHolder>>,
    timeout: Duration,
    poll_interval: Duration,
}

impl InMemoryDeploymentLocks {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            holders: Arc::new(DashMap::new()),
            timeout,
            poll_interval,
        }
    }

    pub fn from_config(config: &LockingConfig) -> Self {
        Self::new(config.timeout(), config.poll_interval())
    }

    pub fn holder(&self, deployment_name: &str) -> Option<LockHolder> {
        self.holders
            .get(deployment_name)
            .map(|holder| holder.value().clone())
    }

    fn try_acquire(&self, deployment_name: &str, task_id: i64) -> std::result::Result<Uuid, i64> {
        match self.holders.entry(deployment_name.to_string()) {
            Entry::Vacant(entry) => {
                let uid = Uuid::new_v4();
                entry.insert(LockHolder {
                    uid,
                    task_id,
                    acquired_at: Utc::now(),
                });
                Ok(uid)
            }
            Entry::Occupied(entry) => Err(entry.get().task_id),
        }
    }
}

impl Default for InMemoryDeploymentLocks {
    fn default() -> Self {
        Self::from_config(&LockingConfig::default())
    }
}

impl DeploymentLock for InMemoryDeploymentLocks {
    fn acquire(&self, deployment_name: &str, task_id: i64) -> Result<DeploymentLockGuard> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match self.try_acquire(deployment_name, task_id) {
                Ok(uid) => {
                    info!(deployment = %deployment_name, task_id, lock_uid = %uid, "Acquired deployment lock");
                    let holders = Arc::clone(&self.holders);
                    let name = deployment_name.to_string();
                    return Ok(DeploymentLockGuard::new(deployment_name, move || {
                        holders.remove_if(&name, |_, holder| holder.uid == uid);
                    }));
                }
                Err(holder_task) if Instant::now() >= deadline => {
                    return Err(DirectorError::DeploymentLocked {
                        deployment: deployment_name.to_string(),
                        holder_task: holder_task.to_string(),
                    });
                }
                Err(holder_task) => {
                    debug!(
                        deployment = %deployment_name,
                        holder_task,
                        "Deployment lock is held, waiting"
                    );
                    std::thread::sleep(self.poll_interval);
                }
            }
        }
    }
}
