//! Typed schema for one line of an evaluation output log.
//!
//! Each field the metrics care about is an optional of a fixed type. A line
//! whose JSON does not fit this schema (bad syntax, or e.g. a string where a
//! cost is expected) fails to parse as a whole and is quarantined by the
//! loader instead of aborting the run.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Instance id used when a record carries none.
pub const UNKNOWN_INSTANCE: &str = "unknown";

/// One benchmark task attempt.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvalRecord {
    #[serde(default)]
    pub instance_id: Option<String>,

    #[serde(default)]
    pub test_result: Option<TestResult>,

    /// Presence-only: any value, including `null`, counts.
    #[serde(default, deserialize_with = "present")]
    pub model_patch: Option<Value>,

    /// Presence-only: any value, including `null`, counts.
    #[serde(default, deserialize_with = "present")]
    pub git_patch: Option<Value>,

    /// Presence-only: any value, including `null`, counts.
    #[serde(default, deserialize_with = "present")]
    pub error: Option<Value>,

    #[serde(default)]
    pub metrics: Option<RunMetrics>,
}

/// The embedded test outcome.
///
/// Only an object is a usable report; anything else is present but
/// carries no resolution verdict.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TestResult {
    Report(Map<String, Value>),
    Other(Value),
}

/// Cost and token accounting for one task.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunMetrics {
    pub accumulated_cost: Option<f64>,
    /// Any JSON number; some producers write counts as floats.
    pub total_tokens: Option<f64>,
}

/// Resolution verdict of a record that carries a test report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Resolved,
    Failed,
}

impl EvalRecord {
    /// Parse a single JSONL line.
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    pub fn instance_id(&self) -> &str {
        self.instance_id.as_deref().unwrap_or(UNKNOWN_INSTANCE)
    }

    /// `None` when the record has no classifiable test report.
    pub fn outcome(&self) -> Option<Outcome> {
        match &self.test_result {
            Some(TestResult::Report(report)) => {
                if report.get("resolved").is_some_and(is_truthy) {
                    Some(Outcome::Resolved)
                } else {
                    Some(Outcome::Failed)
                }
            }
            Some(TestResult::Other(_)) | None => None,
        }
    }

    /// The agent produced a candidate patch, whatever came of it.
    pub fn is_attempted(&self) -> bool {
        self.model_patch.is_some() || self.git_patch.is_some()
    }

    pub fn is_errored(&self) -> bool {
        self.error.is_some()
    }

    pub fn cost(&self) -> f64 {
        self.metrics
            .as_ref()
            .and_then(|m| m.accumulated_cost)
            .unwrap_or(0.0)
    }

    pub fn tokens(&self) -> f64 {
        self.metrics
            .as_ref()
            .and_then(|m| m.total_tokens)
            .unwrap_or(0.0)
    }
}

/// Wrap whatever value is present, so that an explicit `null` still reads
/// as "field present". Absent fields fall back to `None` via `default`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// JSON truthiness: false, null, zero, and empty containers are false.
pub fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
