use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use strum::{Display, EnumString};
use uuid::Uuid;

/// Job type used when a submission carries no usable `type` field.
pub const DEFAULT_JOB_TYPE: &str = "script_generate";

/// JSON keys owned by the typed part of [`JobRecord`]. Steps may not use
/// them in `extra`.
pub const RESERVED_KEYS: [&str; 11] = [
    "id",
    "type",
    "payload",
    "status",
    "created_at",
    "finished_at",
    "errors",
    "context_loaded",
    "brief_valid",
    "variants",
    "fix_applied",
];

/// Opaque job identifier, e.g. `job_3f2a...`. Assigned once at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        Self(format!("job_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Completed,
    Failed,
    TimedOut,
}

/// Narrative style of a generated variant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VariantMode {
    Direct,
    Executive,
    Human,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Variant {
    #[serde(rename = "id")]
    pub label: String,
    pub mode: VariantMode,
    pub text: String,
}

/// Fields written by the built-in steps. Each stays absent until its step runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StepOutputs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_loaded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brief_valid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<Variant>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_applied: Option<bool>,
}

/// A job as held in the queue and threaded through a pipeline.
///
/// The base fields are fixed; `outputs` carries what the built-in steps
/// produce and `extra` is the open map for fields attached by steps
/// registered at runtime. Both are flattened into the JSON form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRecord {
    pub id: JobId,
    #[serde(rename = "type")]
    pub job_type: String,
    pub payload: Map<String, Value>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<String>,
    #[serde(flatten)]
    pub outputs: StepOutputs,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobRecord {
    /// Build a fresh `queued` job from a submitted JSON object.
    pub fn new(payload: Map<String, Value>) -> Self {
        let job_type = payload
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_JOB_TYPE)
            .to_string();

        Self {
            id: JobId::generate(),
            job_type,
            payload,
            status: JobStatus::Queued,
            created_at: Utc::now(),
            finished_at: None,
            errors: Vec::new(),
            outputs: StepOutputs::default(),
            extra: Map::new(),
        }
    }

    /// Remove `extra` entries that would collide with a typed field once the
    /// record is flattened to JSON. Returns the removed keys.
    pub fn strip_reserved_extra(&mut self) -> Vec<String> {
        let reserved: Vec<String> = self
            .extra
            .keys()
            .filter(|k| RESERVED_KEYS.contains(&k.as_str()))
            .cloned()
            .collect();
        for key in &reserved {
            self.extra.remove(key);
        }
        reserved
    }

    /// Look up a payload field with JavaScript-style truthiness.
    pub fn payload_flag(&self, key: &str) -> bool {
        is_truthy(self.payload.get(key))
    }
}

/// Missing, `null`, `false`, `0`, and `""` are falsy; everything else is truthy.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}
