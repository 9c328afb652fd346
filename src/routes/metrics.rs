use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Prometheus metrics scrape endpoint.
/// Returns metrics in Prometheus text exposition format.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}

/// Register descriptions for every metric the orchestrator emits.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "orchestrator_jobs_submitted_total",
        "Total jobs submitted"
    );
    metrics::describe_counter!(
        "orchestrator_jobs_completed_total",
        "Total job runs that completed without errors"
    );
    metrics::describe_counter!(
        "orchestrator_jobs_failed_total",
        "Total job runs that recorded at least one error"
    );
    metrics::describe_counter!(
        "orchestrator_jobs_timed_out_total",
        "Total job runs that exceeded the run timeout"
    );
    metrics::describe_histogram!(
        "orchestrator_run_seconds",
        "Time to run a job through its pipeline"
    );
    metrics::describe_gauge!(
        "orchestrator_queue_depth",
        "Number of jobs held in memory"
    );
}
