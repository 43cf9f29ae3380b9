//! The usage record: one sample pulled from the application's usage endpoint.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single usage sample, transient but persisted in `cache.usage_records` until the
/// next successful bill clears them (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Per-metric usage counts observed at `reporting_time`.
    pub usage: IndexMap<String, u64>,
    pub reporting_time: DateTime<Utc>,
    pub base_product: String,
}

impl UsageRecord {
    /// The value recorded for `metric`, or 0 if the record doesn't mention it (spec.md
    /// §4.5: "records with missing metric keys contribute 0 for that metric").
    pub fn metric_value(&self, metric: &str) -> u64 {
        self.usage.get(metric).copied().unwrap_or(0)
    }
}
