use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::models::job::{JobRecord, Variant, VariantMode};

/// A single named transformation over a job record.
///
/// Handlers receive the current record and return a new one, carrying over
/// every field they do not own. A domain-level failure (an invalid brief, say)
/// is written into the record as data. `Err` means the handler itself broke.
/// New fields go in `extra`; keys listed in
/// [`RESERVED_KEYS`](crate::models::job::RESERVED_KEYS) are dropped
/// by the runner.
#[async_trait]
pub trait Step: Send + Sync {
    async fn apply(&self, job: &JobRecord) -> Result<JobRecord, StepError>;
}

/// Built-in pipeline steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum StepKind {
    SourceContext,
    BriefValidation,
    VariantGeneration,
    FixLoop,
}

/// Fixed stand-in output until variants come from a generation backend.
const VARIANT_TEMPLATES: [(&str, VariantMode, &str); 3] = [
    ("A", VariantMode::Direct, "Operator-first concise narrative."),
    ("B", VariantMode::Executive, "Leadership framing with risk signal."),
    ("C", VariantMode::Human, "Trust-forward practical direction."),
];

#[async_trait]
impl Step for StepKind {
    async fn apply(&self, job: &JobRecord) -> Result<JobRecord, StepError> {
        let mut next = job.clone();
        match self {
            StepKind::SourceContext => {
                next.outputs.context_loaded = Some(true);
            }
            StepKind::BriefValidation => {
                let valid = job.payload_flag("brief_id") && job.payload_flag("source_outlier_id");
                next.outputs.brief_valid = Some(valid);
            }
            StepKind::VariantGeneration => {
                let variants = VARIANT_TEMPLATES
                    .iter()
                    .map(|(label, mode, text)| Variant {
                        label: label.to_string(),
                        mode: *mode,
                        text: text.to_string(),
                    })
                    .collect();
                next.outputs.variants = Some(variants);
            }
            StepKind::FixLoop => {
                next.outputs.fix_applied = Some(job.payload_flag("fix_request"));
            }
        }
        Ok(next)
    }
}

/// Name-to-handler lookup used by the pipeline runner.
#[derive(Clone, Default)]
pub struct StepRegistry {
    steps: HashMap<String, Arc<dyn Step>>,
}

impl StepRegistry {
    /// Empty registry. Most callers want [`StepRegistry::builtin`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every [`StepKind`] under its snake_case name.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for kind in StepKind::iter() {
            registry.register(kind.to_string(), kind);
        }
        registry
    }

    /// Add a handler, replacing any existing one with the same name.
    pub fn register(&mut self, name: impl Into<String>, step: impl Step + 'static) {
        self.steps.insert(name.into(), Arc::new(step));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Step>> {
        self.steps.get(name).cloned()
    }

    /// Registered step names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.steps.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("Step handler failed: {0}")]
    Handler(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};
    use std::str::FromStr;

    fn job_with(payload: Value) -> JobRecord {
        match payload {
            Value::Object(map) => JobRecord::new(map),
            _ => JobRecord::new(Map::new()),
        }
    }

    #[test]
    fn test_step_names_parse() {
        assert_eq!(StepKind::from_str("source_context").unwrap(), StepKind::SourceContext);
        assert_eq!(StepKind::from_str("fix_loop").unwrap(), StepKind::FixLoop);
        assert_eq!(StepKind::VariantGeneration.to_string(), "variant_generation");
        assert!(StepKind::from_str("not_a_real_step").is_err());
    }

    #[test]
    fn test_builtin_registry_contents() {
        let registry = StepRegistry::builtin();
        assert_eq!(
            registry.names(),
            vec!["brief_validation", "fix_loop", "source_context", "variant_generation"]
        );
        assert!(registry.get("nope").is_none());
    }

    #[tokio::test]
    async fn test_source_context_sets_flag() {
        let job = job_with(json!({}));
        let next = StepKind::SourceContext.apply(&job).await.unwrap();
        assert_eq!(next.outputs.context_loaded, Some(true));
        assert_eq!(job.outputs.context_loaded, None);
    }

    #[tokio::test]
    async fn test_brief_validation_requires_both_fields() {
        let valid = job_with(json!({ "brief_id": "b1", "source_outlier_id": "o1" }));
        let next = StepKind::BriefValidation.apply(&valid).await.unwrap();
        assert_eq!(next.outputs.brief_valid, Some(true));

        let partial = job_with(json!({ "brief_id": "b1" }));
        let next = StepKind::BriefValidation.apply(&partial).await.unwrap();
        assert_eq!(next.outputs.brief_valid, Some(false));

        let empty_string = job_with(json!({ "brief_id": "", "source_outlier_id": "o1" }));
        let next = StepKind::BriefValidation.apply(&empty_string).await.unwrap();
        assert_eq!(next.outputs.brief_valid, Some(false));
    }

    #[tokio::test]
    async fn test_variant_generation_is_fixed() {
        let job = job_with(json!({}));
        let next = StepKind::VariantGeneration.apply(&job).await.unwrap();
        let variants = next.outputs.variants.unwrap();
        let labels: Vec<&str> = variants.iter().map(|v| v.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "B", "C"]);
        assert_eq!(variants[0].mode, VariantMode::Direct);
        assert_eq!(variants[1].mode, VariantMode::Executive);
        assert_eq!(variants[2].mode, VariantMode::Human);
        assert_eq!(variants[2].text, "Trust-forward practical direction.");
    }

    #[tokio::test]
    async fn test_fix_loop_reads_fix_request() {
        let job = job_with(json!({ "fix_request": "please fix X" }));
        let next = StepKind::FixLoop.apply(&job).await.unwrap();
        assert_eq!(next.outputs.fix_applied, Some(true));

        let job = job_with(json!({}));
        let next = StepKind::FixLoop.apply(&job).await.unwrap();
        assert_eq!(next.outputs.fix_applied, Some(false));
    }

    #[tokio::test]
    async fn test_steps_preserve_unowned_fields() {
        let mut job = job_with(json!({ "brief_id": "b1" }));
        job.extra.insert("note".to_string(), json!("keep me"));
        job.outputs.fix_applied = Some(true);

        let next = StepKind::SourceContext.apply(&job).await.unwrap();
        assert_eq!(next.extra["note"], "keep me");
        assert_eq!(next.outputs.fix_applied, Some(true));
        assert_eq!(next.payload, job.payload);
        assert_eq!(next.id, job.id);
    }

    #[tokio::test]
    async fn test_register_replaces_handler() {
        struct Marker;

        #[async_trait]
        impl Step for Marker {
            async fn apply(&self, job: &JobRecord) -> Result<JobRecord, StepError> {
                let mut next = job.clone();
                next.extra.insert("marked".to_string(), json!(true));
                Ok(next)
            }
        }

        let mut registry = StepRegistry::builtin();
        registry.register("source_context", Marker);
        let step = registry.get("source_context").unwrap();
        let next = step.apply(&job_with(json!({}))).await.unwrap();
        assert_eq!(next.extra["marked"], true);
        assert_eq!(next.outputs.context_loaded, None);
    }
}
