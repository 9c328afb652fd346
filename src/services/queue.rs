use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;

use crate::models::job::{JobId, JobRecord};

/// In-memory job queue, kept in insertion order.
///
/// Jobs are never evicted. The queue also tracks which jobs have a run in
/// flight so two runs of the same job cannot overwrite each other.
#[derive(Default)]
pub struct JobQueue {
    jobs: RwLock<Vec<JobRecord>>,
    running: Arc<Mutex<HashSet<JobId>>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job. Ids are generated fresh, so duplicates are a caller bug.
    pub async fn push(&self, job: JobRecord) -> Result<(), QueueError> {
        let mut jobs = self.jobs.write().await;
        if jobs.iter().any(|j| j.id == job.id) {
            return Err(QueueError::Duplicate(job.id.to_string()));
        }
        jobs.push(job);
        Ok(())
    }

    /// Snapshot of every job in insertion order.
    pub async fn list(&self) -> Vec<JobRecord> {
        self.jobs.read().await.clone()
    }

    pub async fn get(&self, id: &JobId) -> Option<JobRecord> {
        self.jobs.read().await.iter().find(|j| &j.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Overwrite the stored record with the same id.
    pub async fn replace(&self, job: JobRecord) -> Result<(), QueueError> {
        let mut jobs = self.jobs.write().await;
        let slot = jobs
            .iter_mut()
            .find(|j| j.id == job.id)
            .ok_or_else(|| QueueError::NotFound(job.id.to_string()))?;
        *slot = job;
        Ok(())
    }

    /// Claim a job for a run and return its current record.
    ///
    /// The snapshot is taken and the claim made under the same read lock, so a
    /// run that finished just before sees its own write-back here. The claim is
    /// held until the returned guard is dropped.
    pub async fn begin_run(&self, id: &JobId) -> Result<(JobRecord, RunGuard), QueueError> {
        let jobs = self.jobs.read().await;
        let job = jobs
            .iter()
            .find(|j| &j.id == id)
            .cloned()
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;

        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if !running.insert(id.clone()) {
            return Err(QueueError::AlreadyRunning(id.to_string()));
        }
        drop(running);
        drop(jobs);

        let guard = RunGuard {
            id: id.clone(),
            running: Arc::clone(&self.running),
        };
        Ok((job, guard))
    }

    #[cfg(test)]
    fn is_running(&self, id: &JobId) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }
}

/// Releases a job's run claim on drop, including when the run is cancelled.
pub struct RunGuard {
    id: JobId,
    running: Arc<Mutex<HashSet<JobId>>>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job already running: {0}")]
    AlreadyRunning(String),

    #[error("Duplicate job id: {0}")]
    Duplicate(String),
}
