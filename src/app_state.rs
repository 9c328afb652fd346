use std::sync::Arc;
use std::time::Duration;

use crate::services::{orchestrator::Orchestrator, queue::JobQueue, steps::StepRegistry};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(queue: JobQueue, registry: StepRegistry, run_timeout: Duration) -> Self {
        Self {
            orchestrator: Arc::new(Orchestrator::new(queue, registry, run_timeout)),
        }
    }
}
