//! Exclusive background jobs.
//!
//! Long-running work triggered from a callback (imports, recalculations) is
//! handed to a [`JobRunner`], which guarantees at most one running execution
//! per job name through a [`JobLock`].

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("job '{0}' is already running")]
    AlreadyRunning(String),

    #[error("job '{name}' failed: {message}")]
    Failed { name: String, message: String },
}

/// How the caller waits for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobMode {
    /// Spawn on the runtime and return at once.
    #[default]
    Detached,
    /// Run to completion before returning.
    Wait,
}

/// Lock keyed by job name.
pub trait JobLock: Send + Sync {
    /// Take the lock for `name`; `false` if it is already held.
    fn try_acquire(&self, name: &str) -> bool;

    fn release(&self, name: &str);
}

/// In-process [`JobLock`].
#[derive(Debug, Default)]
pub struct InMemoryJobLock {
    running: DashMap<String, ()>,
}

impl InMemoryJobLock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_held(&self, name: &str) -> bool {
        self.running.contains_key(name)
    }
}

impl JobLock for InMemoryJobLock {
    fn try_acquire(&self, name: &str) -> bool {
        match self.running.entry(name.to_owned()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(());
                true
            }
        }
    }

    fn release(&self, name: &str) {
        self.running.remove(name);
    }
}

/// Releases the job lock when dropped, panics included.
struct Held {
    lock: Arc<dyn JobLock>,
    name: String,
}

impl Drop for Held {
    fn drop(&mut self) {
        self.lock.release(&self.name);
    }
}

#[derive(Clone)]
pub struct JobRunner {
    lock: Arc<dyn JobLock>,
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryJobLock::new()))
    }
}

impl JobRunner {
    #[must_use]
    pub fn new(lock: Arc<dyn JobLock>) -> Self {
        Self { lock }
    }

    /// Run `job` unless another execution named `name` is in flight.
    ///
    /// In [`JobMode::Detached`] the job is spawned on the current tokio
    /// runtime and its failure is only logged.
    ///
    /// # Errors
    /// [`JobError::AlreadyRunning`] if the lock is held;
    /// [`JobError::Failed`] if a [`JobMode::Wait`] job fails.
    pub async fn run_exclusive<F>(&self, name: &str, mode: JobMode, job: F) -> Result<(), JobError>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        if !self.lock.try_acquire(name) {
            info!(job = name, "job already running; skipped");
            return Err(JobError::AlreadyRunning(name.to_owned()));
        }
        let held = Held {
            lock: self.lock.clone(),
            name: name.to_owned(),
        };

        match mode {
            JobMode::Wait => {
                let result = job.await;
                drop(held);
                result.map_err(|e| JobError::Failed {
                    name: name.to_owned(),
                    message: format!("{e:#}"),
                })
            }
            JobMode::Detached => {
                tokio::spawn(async move {
                    if let Err(e) = job.await {
                        error!(job = %held.name, error = ?e, "detached job failed");
                    }
                    drop(held);
                });
                Ok(())
            }
        }
    }
}
