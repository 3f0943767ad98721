//! Holder for the latest analytics snapshot.

use serde_json::{Map, Value};

use crate::error::SyncError;
use crate::models::{AnalyticsSnapshot, ReliabilityVerdict};

/// Last-write-wins store for the article analysis. The snapshot is replaced
/// as a unit, never patched field by field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsStore {
    snapshot: Option<AnalyticsSnapshot>,
}

impl AnalyticsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<&AnalyticsSnapshot> {
        self.snapshot.as_ref()
    }

    /// Swap in a new snapshot from the response's `analytics` field.
    ///
    /// Absent, `null` or `{}` keeps the prior snapshot and returns `Ok(false)`.
    /// A payload that does not parse also keeps the prior snapshot.
    pub fn replace(&mut self, raw: Option<&Value>) -> Result<bool, SyncError> {
        let map = match raw {
            None | Some(Value::Null) => return Ok(false),
            Some(Value::Object(map)) if map.is_empty() => return Ok(false),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(SyncError::InvalidAnalytics(format!(
                    "expected an object, got {}",
                    json_kind(other)
                )))
            }
        };
        let snapshot = AnalyticsSnapshot::from_raw(map.clone())?;
        self.snapshot = Some(snapshot);
        Ok(true)
    }

    /// Normalised `fake_news` verdict; `Unknown` while nothing has been analysed.
    pub fn reliability_verdict(&self) -> ReliabilityVerdict {
        self.snapshot
            .as_ref()
            .map_or(ReliabilityVerdict::Unknown, |s| s.fake_news)
    }

    pub fn readability_display_percent(&self) -> Option<f64> {
        self.snapshot
            .as_ref()
            .and_then(AnalyticsSnapshot::readability_display_percent)
    }

    /// Value sent back in the next request: the raw object, or `{}`.
    pub fn request_payload(&self) -> Value {
        Value::Object(
            self.snapshot
                .as_ref()
                .map(|s| s.raw().clone())
                .unwrap_or_else(Map::new),
        )
    }

    pub fn clear(&mut self) {
        self.snapshot = None;
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
