use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::models::job::{JobId, JobRecord, JobStatus};
use crate::services::pipeline::{run_pipeline, steps_for};
use crate::services::queue::{JobQueue, QueueError};
use crate::services::steps::StepRegistry;

/// Error tag recorded when a run exceeds the configured timeout.
pub const RUN_TIMEOUT_TAG: &str = "run_timeout";

/// Owns the job queue and runs jobs through the step registry.
pub struct Orchestrator {
    queue: JobQueue,
    registry: Arc<StepRegistry>,
    run_timeout: Duration,
}

impl Orchestrator {
    pub fn new(queue: JobQueue, registry: StepRegistry, run_timeout: Duration) -> Self {
        Self {
            queue,
            registry: Arc::new(registry),
            run_timeout,
        }
    }

    /// Create a `queued` job from a raw JSON request body.
    ///
    /// An empty body counts as `{}`. Anything that is not a JSON object is
    /// rejected and nothing is enqueued.
    pub async fn submit(&self, body: &[u8]) -> Result<JobRecord, OrchestratorError> {
        let payload = parse_payload(body)?;
        let job = JobRecord::new(payload);
        self.queue.push(job.clone()).await?;

        metrics::counter!("orchestrator_jobs_submitted_total").increment(1);
        metrics::gauge!("orchestrator_queue_depth").set(self.queue.len().await as f64);

        info!(job_id = %job.id, job_type = %job.job_type, "Job queued");
        Ok(job)
    }

    pub async fn list(&self) -> Vec<JobRecord> {
        self.queue.list().await
    }

    pub async fn get(&self, id: &JobId) -> Result<JobRecord, OrchestratorError> {
        self.queue
            .get(id)
            .await
            .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))
    }

    /// Run a job through its pipeline and store the classified result.
    ///
    /// Each run starts from the stored record with `errors` and
    /// `finished_at` cleared, so terminal jobs may be run again.
    pub async fn run(&self, id: &JobId) -> Result<JobRecord, OrchestratorError> {
        let (mut job, _guard) = self.queue.begin_run(id).await?;
        job.errors.clear();
        job.finished_at = None;

        let steps = steps_for(&job);
        info!(job_id = %job.id, steps = ?steps, "Running job");

        let start = Instant::now();
        let outcome =
            tokio::time::timeout(self.run_timeout, run_pipeline(&self.registry, &job, &steps)).await;
        let mut result = match outcome {
            Ok(mut result) => {
                result.status = if result.errors.is_empty() {
                    JobStatus::Completed
                } else {
                    JobStatus::Failed
                };
                result
            }
            Err(_) => {
                warn!(
                    job_id = %job.id,
                    timeout_ms = self.run_timeout.as_millis() as u64,
                    "Job run timed out"
                );
                job.errors.push(RUN_TIMEOUT_TAG.to_string());
                job.status = JobStatus::TimedOut;
                job
            }
        };
        result.finished_at = Some(Utc::now());

        metrics::histogram!("orchestrator_run_seconds").record(start.elapsed().as_secs_f64());
        match result.status {
            JobStatus::Completed => metrics::counter!("orchestrator_jobs_completed_total").increment(1),
            JobStatus::Failed => metrics::counter!("orchestrator_jobs_failed_total").increment(1),
            JobStatus::TimedOut => metrics::counter!("orchestrator_jobs_timed_out_total").increment(1),
            JobStatus::Queued => {}
        }

        self.queue.replace(result.clone()).await?;

        info!(
            job_id = %result.id,
            status = %result.status,
            errors = result.errors.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Job run finished"
        );
        Ok(result)
    }
}

fn parse_payload(body: &[u8]) -> Result<Map<String, Value>, OrchestratorError> {
    if body.is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(OrchestratorError::InvalidJson),
        Err(e) => {
            warn!(error = %e, "Rejected malformed job submission");
            Err(OrchestratorError::InvalidJson)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job already running: {0}")]
    AlreadyRunning(String),

    #[error("Queue error: {0}")]
    Queue(QueueError),
}

impl From<QueueError> for OrchestratorError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::NotFound(id) => OrchestratorError::NotFound(id),
            QueueError::AlreadyRunning(id) => OrchestratorError::AlreadyRunning(id),
            other => OrchestratorError::Queue(other),
        }
    }
}
