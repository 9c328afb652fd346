use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, warn};

use crate::models::job::JobRecord;
use crate::services::steps::{StepKind, StepRegistry};

/// Steps run when the job payload does not name its own.
pub const DEFAULT_STEPS: [StepKind; 3] = [
    StepKind::SourceContext,
    StepKind::BriefValidation,
    StepKind::VariantGeneration,
];

/// Resolve the ordered step list for a job.
///
/// Uses `payload.steps` when it is an array, otherwise [`DEFAULT_STEPS`].
/// Non-string entries are kept as their JSON text so they surface as
/// unknown steps instead of being dropped.
pub fn steps_for(job: &JobRecord) -> Vec<String> {
    match job.payload.get("steps") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(name) => name.clone(),
                other => other.to_string(),
            })
            .collect(),
        _ => DEFAULT_STEPS.iter().map(ToString::to_string).collect(),
    }
}

/// Thread `job` through `steps` in order and return the final record.
///
/// Unknown names, handler errors and handler panics are recorded as tags in
/// `errors` and the pipeline moves on to the next step with the last good
/// record. Keys a step puts in `extra` that shadow typed fields are dropped.
/// `status` and `finished_at` are left to the caller.
pub async fn run_pipeline(registry: &StepRegistry, job: &JobRecord, steps: &[String]) -> JobRecord {
    let mut current = job.clone();

    for name in steps {
        let Some(step) = registry.get(name) else {
            warn!(job_id = %current.id, step = %name, "Unknown step, skipping");
            current.errors.push(format!("unknown_step:{}", name));
            continue;
        };

        debug!(job_id = %current.id, step = %name, "Running step");
        match AssertUnwindSafe(step.apply(&current)).catch_unwind().await {
            Ok(Ok(mut next)) => {
                let dropped = next.strip_reserved_extra();
                if !dropped.is_empty() {
                    warn!(
                        job_id = %next.id,
                        step = %name,
                        keys = ?dropped,
                        "Dropped reserved keys from step output"
                    );
                }
                current = next;
            }
            Ok(Err(e)) => {
                warn!(job_id = %current.id, step = %name, error = %e, "Step failed");
                current.errors.push(format!("step_failed:{}", name));
            }
            Err(_) => {
                error!(job_id = %current.id, step = %name, "Step panicked");
                current.errors.push(format!("step_panicked:{}", name));
            }
        }
    }

    current
}
