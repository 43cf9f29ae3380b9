//! Configuration model and loader.
//!
//! [`Config`] is the validated, immutable view of the operator-supplied YAML file
//! described in spec.md §6. Construction always goes through [`Config::validate`] —
//! there is no public constructor that skips it. Operators change configuration by
//! restarting the adapter; hot-reload is not supported (spec.md §4.2).

pub mod version;

use std::path::Path;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::AdapterError;
use version::Version;

/// Oldest and newest `version` values this build of the adapter accepts.
pub const SUPPORTED_VERSION_MIN: Version = Version::new(1, 0, 0);
pub const SUPPORTED_VERSION_MAX: Version = Version::new(1, 999, 999);

/// Billing cadence. `Fixed` corresponds to the v1.2 "fixed billing" override described in
/// spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BillingIntervalKind {
    Monthly,
    Hourly,
}

/// The effective billing cadence after applying the optional fixed-duration override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingInterval {
    Monthly,
    Hourly,
    Fixed(Duration),
}

/// The reporting (heartbeat) cadence. Either a concrete interval in seconds, or symbolic
/// "same as billing", per spec.md §3's "seconds or CSP-dependent symbolic".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportingInterval {
    Seconds(u64),
    Symbolic(ReportingIntervalSymbol),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportingIntervalSymbol {
    SameAsBilling,
}

/// How a metric's per-tick samples are folded into one value (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UsageAggregation {
    Maximum,
    Average,
    Current,
}

/// How an aggregated value is turned into a dimension vector (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConsumptionReporting {
    Volume,
    Tiered,
}

/// Minimum billable consumption: values below this count are billed as if they were this
/// count (spec.md §4.6 "Pre-adjust").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinConsumption {
    pub count: u64,
}

/// A single priced dimension tier within a metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionTier {
    pub dimension: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
}

/// One configured usage metric: how to aggregate it and how to map it to dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetric {
    pub usage_aggregation: UsageAggregation,
    pub consumption_reporting: ConsumptionReporting,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_consumption: Option<MinConsumption>,
    pub dimensions: Vec<DimensionTier>,
}

/// The validated, immutable adapter configuration.
///
/// Always constructed via [`Config::load`] / [`Config::from_yaml_str`] — there is no
/// public constructor that skips validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: Version,
    pub billing_interval: BillingIntervalKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_billing_interval_seconds: Option<u64>,
    pub query_interval: u64,
    pub reporting_interval: ReportingInterval,
    pub reporting_api_is_cumulative: bool,
    pub product_code: String,
    pub archive_retention_period: u32,
    pub usage_metrics: IndexMap<String, UsageMetric>,
}

impl Config {
    /// Loads and validates a configuration file.
    ///
    /// Syntax or schema errors are fatal at boot (spec.md §6).
    #[tracing::instrument(target = "csp_billing_adapter::config", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AdapterError> {
        let path = path.as_ref();
        tracing::debug!(target: "csp_billing_adapter::config", "loading configuration file");

        let raw = std::fs::read_to_string(path).map_err(|e| {
            AdapterError::Config(format!("failed to read {}: {e}", path.display()))
        })?;

        let config: Config = serde_yaml::from_str(&raw)
            .map_err(|e| AdapterError::Config(format!("invalid config syntax: {e}")))?;

        config.validate()?;

        tracing::info!(
            target: "csp_billing_adapter::config",
            version = %config.version,
            metrics = config.usage_metrics.len(),
            "configuration loaded"
        );

        Ok(config)
    }

    /// Parses and validates a configuration document already in memory. Used by tests
    /// and by `load_defaults` merging.
    pub fn from_yaml_str(raw: &str) -> Result<Self, AdapterError> {
        let config: Config = serde_yaml::from_str(raw)
            .map_err(|e| AdapterError::Config(format!("invalid config syntax: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Runs every structural check from spec.md §4.2. The returned error names the
    /// offending key, as required.
    pub fn validate(&self) -> Result<(), AdapterError> {
        if !self
            .version
            .major_compatible(SUPPORTED_VERSION_MIN, SUPPORTED_VERSION_MAX)
        {
            return Err(AdapterError::Config(format!(
                "version {} is not compatible with supported range {}..={}",
                self.version, SUPPORTED_VERSION_MIN, SUPPORTED_VERSION_MAX
            )));
        }

        if self.query_interval == 0 {
            return Err(AdapterError::Config(
                "query_interval must be a positive number of seconds".into(),
            ));
        }

        let reporting_seconds = self.reporting_interval_seconds();
        if let Some(reporting_seconds) = reporting_seconds
            && reporting_seconds == 0
        {
            return Err(AdapterError::Config(
                "reporting_interval must be a positive number of seconds".into(),
            ));
        }

        if let Some(reporting_seconds) = reporting_seconds
            && self.query_interval > reporting_seconds
        {
            return Err(AdapterError::Config(format!(
                "query_interval ({}) must be <= reporting_interval ({})",
                self.query_interval, reporting_seconds
            )));
        }

        if let (Some(reporting_seconds), Some(billing_seconds)) =
            (reporting_seconds, self.billing_interval_seconds())
            && reporting_seconds > billing_seconds
        {
            return Err(AdapterError::Config(format!(
                "reporting_interval ({reporting_seconds}) must be <= billing_interval ({billing_seconds})"
            )));
        }

        if self.usage_metrics.is_empty() {
            return Err(AdapterError::Config(
                "usage_metrics must contain at least one metric".into(),
            ));
        }

        for (name, metric) in &self.usage_metrics {
            if metric.dimensions.is_empty() {
                return Err(AdapterError::Config(format!(
                    "usage_metrics.{name}.dimensions must contain at least one dimension"
                )));
            }
            validate_dimension_order(name, &metric.dimensions)?;
        }

        Ok(())
    }

    /// The reporting interval in seconds, or `None` when it is symbolic and the billing
    /// interval itself has no fixed duration (e.g. `monthly` with no override).
    pub fn reporting_interval_seconds(&self) -> Option<u64> {
        match self.reporting_interval {
            ReportingInterval::Seconds(s) => Some(s),
            ReportingInterval::Symbolic(ReportingIntervalSymbol::SameAsBilling) => {
                self.billing_interval_seconds()
            }
        }
    }

    /// The billing interval in seconds, when it has a fixed duration (`hourly` or a
    /// `fixed_billing_interval_seconds` override). `monthly` without an override has no
    /// fixed duration — calendar arithmetic is used instead (spec.md §4.1).
    pub fn billing_interval_seconds(&self) -> Option<u64> {
        if let Some(fixed) = self.fixed_billing_interval_seconds {
            return Some(fixed);
        }
        match self.billing_interval {
            BillingIntervalKind::Hourly => Some(3600),
            BillingIntervalKind::Monthly => None,
        }
    }

    /// The effective billing interval, folding in the fixed-duration override.
    pub fn effective_billing_interval(&self) -> BillingInterval {
        if let Some(seconds) = self.fixed_billing_interval_seconds {
            return BillingInterval::Fixed(Duration::from_secs(seconds));
        }
        match self.billing_interval {
            BillingIntervalKind::Monthly => BillingInterval::Monthly,
            BillingIntervalKind::Hourly => BillingInterval::Hourly,
        }
    }
}

/// Validates the dimension ordering invariant from spec.md §3: ascending tier boundaries,
/// each `min` contiguous with the previous `max`, and the unbounded tier (if any) is last.
fn validate_dimension_order(metric: &str, dimensions: &[DimensionTier]) -> Result<(), AdapterError> {
    for (i, tier) in dimensions.iter().enumerate() {
        let is_last = i + 1 == dimensions.len();
        if tier.max.is_none() && !is_last {
            return Err(AdapterError::Config(format!(
                "usage_metrics.{metric}.dimensions[{i}] ({}) is unbounded but is not the last dimension",
                tier.dimension
            )));
        }

        if i > 0 {
            let prev = &dimensions[i - 1];
            let (Some(prev_max), Some(min)) = (prev.max, tier.min) else {
                return Err(AdapterError::Config(format!(
                    "usage_metrics.{metric}.dimensions[{i}] ({}) must declare `min` following a bounded predecessor",
                    tier.dimension
                )));
            };
            if min != prev_max + 1 {
                return Err(AdapterError::Config(format!(
                    "usage_metrics.{metric}.dimensions[{i}] ({}) min ({min}) must equal the previous dimension's max + 1 ({})",
                    tier.dimension,
                    prev_max + 1
                )));
            }
        }

        if let (Some(min), Some(max)) = (tier.min, tier.max)
            && min > max
        {
            return Err(AdapterError::Config(format!(
                "usage_metrics.{metric}.dimensions[{i}] ({}) has min ({min}) > max ({max})",
                tier.dimension
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn sample_yaml() -> &'static str {
    r#"
version: "1.2.0"
billing_interval: hourly
query_interval: 60
reporting_interval: 300
reporting_api_is_cumulative: false
product_code: example-product
archive_retention_period: 12
usage_metrics:
  managed_node_count:
    usage_aggregation: maximum
    consumption_reporting: tiered
    dimensions:
      - dimension: tier_1
        min: 0
        max: 30
      - dimension: tier_2
        min: 31
        max: 40
      - dimension: tier_3
        min: 41
"#
}
