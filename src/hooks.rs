//! The *General* plugin capability (spec.md §6): adapter-specific preflight, defaults,
//! usage retrieval, and version reporting.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::error::AdapterError;
use crate::model::UsageRecord;

/// Hooks the adapter calls into the tenant application, distinct from [`crate::storage::Storage`]
/// and [`crate::biller::MeteringClient`].
pub trait AdapterHooks: Send + Sync {
    /// Idempotent preflight, run once during [`crate::bootstrap::bootstrap`].
    fn setup_adapter(&self, config: &Config) -> impl Future<Output = Result<(), AdapterError>> + Send;

    /// Baseline defaults merged under the operator-supplied config file.
    fn load_defaults(&self, config: Config) -> Config {
        config
    }

    /// Pulls one usage sample from the application's usage endpoint.
    fn get_usage_data(
        &self,
        config: &Config,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<UsageRecord, AdapterError>> + Send;

    fn get_version(&self) -> &str;
}

/// A generic HTTP-backed [`AdapterHooks`], bundled as a reference implementation for
/// the tenant application's usage endpoint — concrete endpoint format is out of scope
/// (spec.md §1) and left to whatever the real application exposes.
#[cfg(feature = "http-csp")]
pub struct HttpAdapterHooks {
    client: reqwest::Client,
    usage_endpoint: String,
    version: String,
}

#[cfg(feature = "http-csp")]
impl HttpAdapterHooks {
    pub fn new(usage_endpoint: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            usage_endpoint: usage_endpoint.into(),
            version: version.into(),
        }
    }
}

#[cfg(feature = "http-csp")]
impl AdapterHooks for HttpAdapterHooks {
    async fn setup_adapter(&self, _config: &Config) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn get_usage_data(&self, _config: &Config, now: DateTime<Utc>) -> Result<UsageRecord, AdapterError> {
        let mut record: UsageRecord = self
            .client
            .get(&self.usage_endpoint)
            .send()
            .await
            .map_err(|e| AdapterError::Usage(e.to_string()))?
            .json()
            .await
            .map_err(|e| AdapterError::Usage(format!("malformed usage response: {e}")))?;
        record.reporting_time = now;
        Ok(record)
    }

    fn get_version(&self) -> &str {
        &self.version
    }
}
