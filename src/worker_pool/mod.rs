//! # Bounded Worker Pool
//!
//! A fixed-capacity pool of OS threads pulling actions from a shared FIFO queue.
//!
//! Workers are created lazily: submitting an action spawns a new worker only
//! while fewer than `capacity` workers are busy, otherwise the action waits in
//! the queue for the next worker that frees up. A worker that finds the queue
//! empty hands its slot back and exits.
//!
//! The first action failure is delivered to the controlling thread (the one
//! calling [`WorkerPool::wait_for_drain`]); later failures are logged and
//! dropped so at most one error ever reaches the caller.
//!
//! ```rust,no_run
//! use director_core::worker_pool::WorkerPool;
//! use director_core::DirectorError;
//!
//! # fn main() -> Result<(), DirectorError> {
//! let pool: WorkerPool<DirectorError> = WorkerPool::new("render", 4)?;
//! pool.run_scoped(|pool| {
//!     for index in 0..16 {
//!         pool.submit(move || {
//!             tracing::debug!(index, "rendering");
//!             Ok(())
//!         })?;
//!     }
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde::Serialize;
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Poll interval used by [`WorkerPool::wait_for_drain`] unless overridden
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A queued unit of work
pub type Action<E> = Box<dyn FnOnce() -> Result<(), E> + Send + 'static>;

/// Failures raised by the pool itself rather than by submitted actions
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker pool capacity must be at least 1")]
    InvalidCapacity,
    #[error("worker pool has been shut down")]
    Closed,
    #[error("failed to spawn worker thread: {0}")]
    SpawnFailed(#[from] std::io::Error),
    #[error("worker action panicked: {0}")]
    ActionPanicked(String),
}

/// Lifecycle of a pool; `Open -> Closed` is one-way
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    Open,
    Closed,
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Point-in-time view of the pool's bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub capacity: usize,
    pub available_slots: usize,
    pub live_workers: usize,
    pub pending: usize,
    pub status: PoolStatus,
    pub failed: bool,
}

struct PoolState<E> {
    pending: VecDeque<Action<E>>,
    live_workers: HashMap<usize, JoinHandle<()>>,
    available_slots: usize,
    status: PoolStatus,
    failed: bool,
    next_worker_id: usize,
}

struct Shared<E> {
    name: String,
    capacity: usize,
    state: Mutex<PoolState<E>>,
    failure_tx: Sender<E>,
}

/// Bounded pool of worker threads with first-failure-wins propagation
pub struct WorkerPool<E> {
    shared: Arc<Shared<E>>,
    failure_rx: Receiver<E>,
    poll_interval: Duration,
}

impl<E> WorkerPool<E>
where
    E: From<PoolError> + fmt::Display + Send + 'static,
{
    /// Create an open pool; no thread is started until work is submitted
    pub fn new(name: impl Into<String>, capacity: usize) -> Result<Self, PoolError> {
        if capacity == 0 {
            return Err(PoolError::InvalidCapacity);
        }

        // Only the first failure is ever sent, so one slot is enough
        let (failure_tx, failure_rx) = channel::bounded(1);
        let shared = Shared {
            name: name.into(),
            capacity,
            state: Mutex::new(PoolState {
                pending: VecDeque::new(),
                live_workers: HashMap::new(),
                available_slots: capacity,
                status: PoolStatus::Open,
                failed: false,
                next_worker_id: 0,
            }),
            failure_tx,
        };

        debug!(pool = %shared.name, capacity, "Created worker pool");

        Ok(Self {
            shared: Arc::new(shared),
            failure_rx,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Override how often [`wait_for_drain`](Self::wait_for_drain) re-checks the pool
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Queue an action, spawning a worker for it when a slot is free.
    ///
    /// Never waits for the action to run.
    pub fn submit<F>(&self, action: F) -> Result<(), E>
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        if state.status == PoolStatus::Closed {
            return Err(PoolError::Closed.into());
        }

        state.pending.push_back(Box::new(action));

        if state.available_slots == 0 {
            debug!(
                pool = %self.shared.name,
                pending = state.pending.len(),
                "All workers are currently busy, queuing action"
            );
            return Ok(());
        }

        // Slot check, decrement and spawn happen under the same lock
        state.available_slots -= 1;
        let worker_id = state.next_worker_id;
        state.next_worker_id += 1;
        debug!(pool = %self.shared.name, worker_id, "Creating new worker thread");

        match spawn_worker(Arc::clone(&self.shared), worker_id) {
            Ok(handle) => {
                state.live_workers.insert(worker_id, handle);
                Ok(())
            }
            Err(error) => {
                state.available_slots += 1;
                state.pending.pop_back();
                Err(PoolError::SpawnFailed(error).into())
            }
        }
    }

    /// Whether work is outstanding and no failure has been captured yet
    pub fn is_working(&self) -> bool {
        let state = self.shared.state.lock();
        !state.failed
            && (state.available_slots != self.shared.capacity || !state.pending.is_empty())
    }

    pub fn has_failed(&self) -> bool {
        self.shared.state.lock().failed
    }

    /// Block until every queued action has run or the first failure arrives.
    ///
    /// The first failure is returned exactly once; after that the pool no
    /// longer counts as working and later calls return `Ok(())` immediately.
    pub fn wait_for_drain(&self) -> Result<(), E> {
        debug!(pool = %self.shared.name, "Waiting for actions to complete");
        loop {
            // A failure is published under the same lock that sets `failed`,
            // so once `is_working` reports false the error is already queued.
            let working = self.is_working();
            if let Ok(error) = self.failure_rx.try_recv() {
                return Err(error);
            }
            if !working {
                return Ok(());
            }

            match self.failure_rx.recv_timeout(self.poll_interval) {
                Ok(error) => return Err(error),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            }
        }
    }

    /// Close the pool, drop queued actions and join every live worker.
    ///
    /// Idempotent. Must be called from the controlling thread, never from
    /// inside a submitted action.
    pub fn shutdown(&self) {
        let (dropped, workers) = {
            let mut state = self.shared.state.lock();
            if state.status == PoolStatus::Closed {
                return;
            }
            state.status = PoolStatus::Closed;
            let dropped = std::mem::take(&mut state.pending);
            let workers = std::mem::take(&mut state.live_workers);
            (dropped, workers)
        };

        debug!(
            pool = %self.shared.name,
            dropped_actions = dropped.len(),
            live_workers = workers.len(),
            "Shutting down worker pool"
        );
        drop(dropped);

        for (worker_id, handle) in workers {
            if handle.join().is_err() {
                warn!(pool = %self.shared.name, worker_id, "Worker thread terminated abnormally");
            }
        }
    }

    /// Run `body` against the pool, wait for the work it submitted, and shut
    /// the pool down on every exit path.
    pub fn run_scoped<T, F>(self, body: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
    {
        let result = body(&self).and_then(|value| self.wait_for_drain().map(|()| value));
        self.shutdown();
        result
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.shared.state.lock();
        PoolStats {
            capacity: self.shared.capacity,
            available_slots: state.available_slots,
            live_workers: state.live_workers.len(),
            pending: state.pending.len(),
            status: state.status,
            failed: state.failed,
        }
    }
}

impl<E> Drop for WorkerPool<E> {
    fn drop(&mut self) {
        let workers = {
            let mut state = self.shared.state.lock();
            state.status = PoolStatus::Closed;
            state.pending.clear();
            std::mem::take(&mut state.live_workers)
        };
        for (_, handle) in workers {
            let _ = handle.join();
        }
    }
}

impl<E> Shared<E>
where
    E: fmt::Display,
{
    fn capture_failure(&self, error: E) {
        let mut state = self.state.lock();
        if state.failed {
            warn!(
                pool = %self.name,
                error = %error,
                "Worker action failed after the first failure was captured, discarding"
            );
            return;
        }

        state.failed = true;
        debug!(pool = %self.name, error = %error, "Worker action failed, propagating to controller");
        if let Err(send_error) = self.failure_tx.try_send(error) {
            warn!(pool = %self.name, error = %send_error.into_inner(), "Unable to deliver worker failure");
        }
    }
}

fn spawn_worker<E>(shared: Arc<Shared<E>>, worker_id: usize) -> std::io::Result<JoinHandle<()>>
where
    E: From<PoolError> + fmt::Display + Send + 'static,
{
    thread::Builder::new()
        .name(format!("{}-worker-{}", shared.name, worker_id))
        .spawn(move || run_worker(&shared, worker_id))
}

fn run_worker<E>(shared: &Shared<E>, worker_id: usize)
where
    E: From<PoolError> + fmt::Display,
{
    loop {
        let action = {
            let mut state = shared.state.lock();
            match state.pending.pop_front() {
                Some(action) => action,
                None => {
                    debug!(pool = %shared.name, worker_id, "Worker is no longer needed, cleaning up");
                    state.available_slots += 1;
                    // A closing pool owns the handles it is about to join
                    if state.status == PoolStatus::Open {
                        state.live_workers.remove(&worker_id);
                    }
                    return;
                }
            }
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(action)).unwrap_or_else(|payload| {
            Err(PoolError::ActionPanicked(panic_message(payload.as_ref())).into())
        });

        if let Err(error) = outcome {
            shared.capture_failure(error);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests;
