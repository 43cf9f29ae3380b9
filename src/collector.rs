//! Wraps the external application-usage capability, attaching timestamps and tags and
//! retrying transient failures (spec.md §4.4).

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::hooks::AdapterHooks;
use crate::model::UsageRecord;
use crate::retry::RetryPolicy;

/// Retries [`AdapterHooks::get_usage_data`] per [`RetryPolicy`], turning exhaustion into
/// a ledger message rather than propagating the error (spec.md §4.4: "the cycle proceeds
/// without a new sample").
pub struct UsageCollector<'a, H> {
    hooks: &'a H,
    retry: RetryPolicy,
}

impl<'a, H: AdapterHooks> UsageCollector<'a, H> {
    pub fn new(hooks: &'a H, retry: RetryPolicy) -> Self {
        Self { hooks, retry }
    }

    /// Returns `Some(record)` on a successful sample, `None` with a ledger message on
    /// exhaustion; never propagates the underlying error.
    pub async fn collect(&self, config: &Config, now: DateTime<Utc>) -> (Option<UsageRecord>, Option<String>) {
        match self.retry.run(|| self.hooks.get_usage_data(config, now)).await {
            Ok(record) => (Some(record), None),
            Err(e) => (None, Some(format!("Usage data retrieval failed: {e}"))),
        }
    }
}
