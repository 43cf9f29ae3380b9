//! Boot sequence (spec.md §4.10, §8 scenario 7): validates configuration (already done
//! by [`crate::config::Config::load`]), verifies CSP access with a dry-run meter of zero
//! units, seeds the initial cache, then yields control to [`crate::heart::Heart`].
//!
//! Failure here is fatal: nothing is written to storage, and the process exits with the
//! CSP-access-failure code before `heart` ever runs a cycle.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::biller::{MeterStatus, MeteringClient};
use crate::clock::{next_bill_deadline, next_report_deadline};
use crate::config::Config;
use crate::error::AdapterError;
use crate::hooks::AdapterHooks;
use crate::model::{Cache, DimensionUnits};
use crate::retry::RetryPolicy;

/// Runs the adapter's one-time boot sequence and returns the seeded [`Cache`] plus the
/// CSP's opaque customer metadata blob to carry into the first `csp-config` write.
#[tracing::instrument(target = "csp_billing_adapter::bootstrap", skip_all)]
pub async fn bootstrap<H, M>(
    config: &Config,
    hooks: &H,
    metering: &M,
    retry: RetryPolicy,
    now: DateTime<Utc>,
) -> Result<(Cache, Value), AdapterError>
where
    H: AdapterHooks,
    M: MeteringClient,
{
    hooks.setup_adapter(config).await?;

    let customer_csp_data = retry
        .run(|| metering.get_csp_config_metadata())
        .await
        .map_err(|e| AdapterError::BootCspAccess(format!("failed to fetch CSP metadata: {e}")))?;

    let zero_dimensions = zero_dimension_vector(config);

    let outcome = retry
        .run(|| {
            metering.meter_billing(&zero_dimensions, &config.product_code, &customer_csp_data, now, true)
        })
        .await
        .map_err(|e| AdapterError::BootCspAccess(format!("dry-run meter call failed: {e}")))?;

    if outcome.status != MeterStatus::Ok {
        return Err(AdapterError::BootCspAccess(
            outcome.detail.unwrap_or_else(|| "dry-run meter call rejected".into()),
        ));
    }

    tracing::info!(target: "csp_billing_adapter::bootstrap", "CSP access verified, seeding cache");

    let cache = Cache::new(now, next_bill_deadline(now, config), next_report_deadline(now, config));

    Ok((cache, customer_csp_data))
}

fn zero_dimension_vector(config: &Config) -> Vec<DimensionUnits> {
    config
        .usage_metrics
        .values()
        .flat_map(|metric| metric.dimensions.iter())
        .map(|tier| DimensionUnits::new(tier.dimension.clone(), 0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::sample_yaml;
    use std::time::Duration;

    struct OkHooks;
    impl AdapterHooks for OkHooks {
        async fn setup_adapter(&self, _config: &Config) -> Result<(), AdapterError> {
            Ok(())
        }
        async fn get_usage_data(&self, _config: &Config, now: DateTime<Utc>) -> Result<crate::model::UsageRecord, AdapterError> {
            Ok(crate::model::UsageRecord {
                usage: Default::default(),
                reporting_time: now,
                base_product: "example-product".into(),
            })
        }
        fn get_version(&self) -> &str {
            "test"
        }
    }

    struct StubMetering {
        ok: bool,
    }
    impl MeteringClient for StubMetering {
        async fn meter_billing(
            &self,
            _dimensions: &[DimensionUnits],
            _product_code: &str,
            _customer_csp_data: &Value,
            _timestamp: DateTime<Utc>,
            _dry_run: bool,
        ) -> Result<crate::biller::MeterOutcome, AdapterError> {
            Ok(crate::biller::MeterOutcome {
                status: if self.ok { MeterStatus::Ok } else { MeterStatus::Failed },
                record_id: self.ok.then(|| "dry-run".to_string()),
                detail: (!self.ok).then(|| "rejected".to_string()),
            })
        }
        async fn get_csp_config_metadata(&self) -> Result<Value, AdapterError> {
            Ok(Value::Null)
        }
        async fn get_account_info(&self) -> Result<Value, AdapterError> {
            Ok(Value::Null)
        }
    }

    fn retry() -> RetryPolicy {
        RetryPolicy { max_attempts: 2, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(2) }
    }

    #[tokio::test]
    async fn successful_boot_seeds_cache() {
        let config = Config::from_yaml_str(sample_yaml()).unwrap();
        let now = Utc::now();
        let (cache, _) = bootstrap(&config, &OkHooks, &StubMetering { ok: true }, retry(), now)
            .await
            .unwrap();
        assert_eq!(cache.adapter_start_time, now);
        assert!(cache.usage_records.is_empty());
    }

    #[tokio::test]
    async fn failed_dry_run_is_fatal() {
        let config = Config::from_yaml_str(sample_yaml()).unwrap();
        let now = Utc::now();
        let err = bootstrap(&config, &OkHooks, &StubMetering { ok: false }, retry(), now)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::BootCspAccess(_)));
    }
}
