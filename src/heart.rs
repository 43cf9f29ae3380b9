//! The control loop (spec.md §4.9): orchestrates
//! tick → collect → aggregate → (report | bill) → archive → persist → sleep-remainder.
//!
//! A single `async fn` drives one [`tokio::time::sleep`] per cycle; there is no
//! per-cycle task spawning (spec.md §5).

use chrono::{DateTime, Utc};
use serde_json::Value;
use strum::Display;

use crate::aggregator::aggregate;
use crate::biller::{Biller, MeteringClient};
use crate::clock::{expire_at, next_bill_deadline, next_query_deadline, next_report_deadline, Clock};
use crate::collector::UsageCollector;
use crate::config::Config;
use crate::dimension::map_dimensions;
use crate::hooks::AdapterHooks;
use crate::ledger::ErrorLedger;
use crate::model::{Archive, ArchiveEntry, Cache, CspConfig, DimensionUnits, LastBill};
use crate::storage::Storage;

/// The eight states from spec.md §4.9, kept around for logging/observability even
/// though the cycle itself is expressed as straight-line code rather than a dispatch
/// table (each state visits at most once per cycle, so a table buys nothing here).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AdapterState {
    Boot,
    IdleWait,
    Collecting,
    Reporting,
    Billing,
    Archiving,
    Persisting,
    Crashed,
}

/// Owns the config, the capability implementations, and drives cycles.
pub struct Heart<'a, C, H, S, M> {
    config: &'a Config,
    clock: &'a C,
    hooks: &'a H,
    storage: &'a S,
    metering: &'a M,
    retry: crate::retry::RetryPolicy,
}

impl<'a, C, H, S, M> Heart<'a, C, H, S, M>
where
    C: Clock,
    H: AdapterHooks,
    S: Storage,
    M: MeteringClient,
{
    pub fn new(config: &'a Config, clock: &'a C, hooks: &'a H, storage: &'a S, metering: &'a M) -> Self {
        Self {
            config,
            clock,
            hooks,
            storage,
            metering,
            retry: crate::retry::RetryPolicy::default(),
        }
    }

    /// Runs cycles until `ctrl_c` or, if `once` is set, after exactly one cycle.
    ///
    /// `cache` and `customer_csp_data` come from [`crate::bootstrap::bootstrap`].
    pub async fn run(
        &self,
        mut cache: Cache,
        customer_csp_data: Value,
        once: bool,
    ) -> Result<(), crate::error::AdapterError> {
        let mut billing_api_access_ok = true;

        loop {
            let cycle_start = self.clock.now();
            let next_query_time = next_query_deadline(cycle_start, self.config);

            let mut ledger = ErrorLedger::new();
            let state = self
                .run_cycle(&mut cache, &customer_csp_data, &mut ledger, &mut billing_api_access_ok)
                .await;

            if let Err(e) = state {
                tracing::error!(target: crate::TRACING_TARGET_HEART, error = %e, "unexpected error, best-effort persisting and exiting");
                ledger.push(format!("Unexpected error: {e}"));
                let _ = self
                    .persist(&cache, &ledger, &customer_csp_data, billing_api_access_ok)
                    .await;
                return Err(e);
            }

            if once {
                return Ok(());
            }

            // Sleep only the remainder of `query_interval` scheduled from `cycle_start`,
            // not a fresh interval measured from here — otherwise processing time
            // accumulates as drift every cycle (spec.md §4.9).
            let now = self.clock.now();
            let sleep_for = (next_query_time - now).to_std().unwrap_or_default();

            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!(target: crate::TRACING_TARGET_HEART, "shutdown signal received, exiting after current cycle");
                    return Ok(());
                }
            }
        }
    }

    /// Runs exactly one cycle: collect, then report or bill as deadlines dictate, then
    /// archive and persist. Returns `Err` only for faults that should crash the process
    /// (`AdapterState::Crashed`); every other fault is folded into `ledger`.
    async fn run_cycle(
        &self,
        cache: &mut Cache,
        customer_csp_data: &Value,
        ledger: &mut ErrorLedger,
        billing_api_access_ok: &mut bool,
    ) -> Result<(), crate::error::AdapterError> {
        let now = self.clock.now();
        tracing::debug!(target: crate::TRACING_TARGET_HEART, state = %AdapterState::Collecting, "cycle start");

        self.collect(cache, now, ledger).await;

        let should_report = now >= cache.next_reporting_time && cache.next_reporting_time < cache.next_bill_time;
        if should_report {
            tracing::debug!(target: crate::TRACING_TARGET_HEART, state = %AdapterState::Reporting, "heartbeat due");
            self.report(cache, customer_csp_data, now, ledger, billing_api_access_ok).await;
            cache.next_reporting_time = next_report_deadline(now, self.config);
        }

        if now >= cache.next_bill_time {
            tracing::debug!(target: crate::TRACING_TARGET_HEART, state = %AdapterState::Billing, "bill due");
            self.bill(cache, customer_csp_data, now, ledger, billing_api_access_ok).await;
        }

        self.persist(cache, ledger, customer_csp_data, *billing_api_access_ok).await?;
        Ok(())
    }

    async fn collect(&self, cache: &mut Cache, now: DateTime<Utc>, ledger: &mut ErrorLedger) {
        let collector = UsageCollector::new(self.hooks, self.retry);
        let (record, message) = collector.collect(self.config, now).await;
        if let Some(record) = record {
            cache.usage_records.push(record);
        }
        if let Some(message) = message {
            ledger.push(message);
        }
        cache.usage_records.sort_by_key(|r| r.reporting_time);
    }

    /// Aggregates every configured metric over `usage_records` and maps each to its
    /// dimension vector. Returns `None` (having already pushed the cause to `ledger`) on
    /// the first aggregation or mapping failure, skipping the billing/reporting step for
    /// this cycle.
    fn compute_dimensions(&self, usage_records: &[crate::model::UsageRecord], ledger: &mut ErrorLedger) -> Option<Vec<DimensionUnits>> {
        let mut all_dimensions: Vec<DimensionUnits> = Vec::new();
        for (name, metric) in &self.config.usage_metrics {
            let value = match aggregate(usage_records, name, metric.usage_aggregation) {
                Ok(v) => v,
                Err(e) => {
                    ledger.push(e.to_string());
                    return None;
                }
            };
            match map_dimensions(metric, value) {
                Ok(dims) => all_dimensions.extend(dims),
                Err(e) => {
                    ledger.push(e);
                    return None;
                }
            }
        }
        Some(all_dimensions)
    }

    /// Submits a heartbeat report: the current aggregate, without clearing
    /// `usage_records` (spec.md §4.9). `reporting_api_is_cumulative` selects whether the
    /// CSP expects the running total since the last bill, or just the delta since the
    /// previous heartbeat — tracked via `cache.last_reported`.
    async fn report(
        &self,
        cache: &mut Cache,
        customer_csp_data: &Value,
        now: DateTime<Utc>,
        ledger: &mut ErrorLedger,
        billing_api_access_ok: &mut bool,
    ) {
        let Some(all_dimensions) = self.compute_dimensions(&cache.usage_records, ledger) else {
            return;
        };

        let to_submit = if self.config.reporting_api_is_cumulative {
            all_dimensions.clone()
        } else {
            delta_dimensions(&all_dimensions, cache.last_reported.as_deref())
        };

        let biller = Biller::new(self.metering);
        let result = self
            .retry
            .run(|| biller.submit(&to_submit, &self.config.product_code, customer_csp_data, now, true))
            .await;

        match result {
            Ok(_) => cache.last_reported = Some(all_dimensions),
            Err(e) => {
                *billing_api_access_ok = false;
                ledger.push(format!("heartbeat report failed: {e}"));
            }
        }
    }

    async fn bill(
        &self,
        cache: &mut Cache,
        customer_csp_data: &Value,
        now: DateTime<Utc>,
        ledger: &mut ErrorLedger,
        billing_api_access_ok: &mut bool,
    ) {
        let Some(all_dimensions) = self.compute_dimensions(&cache.usage_records, ledger) else {
            return;
        };

        let biller = Biller::new(self.metering);
        let result = self
            .retry
            .run(|| biller.submit(&all_dimensions, &self.config.product_code, customer_csp_data, now, false))
            .await;

        match result {
            Ok(billed) => {
                let billed_records = std::mem::take(&mut cache.usage_records);

                cache.last_bill = Some(LastBill {
                    record_id: billed.record_id,
                    metering_time: billed.metering_time,
                    dimensions: all_dimensions.clone(),
                });
                cache.next_bill_time = next_bill_deadline(now, self.config);
                cache.next_reporting_time = next_report_deadline(now, self.config);
                cache.last_reported = None;

                self.archive(now, all_dimensions, billed_records, ledger).await;
            }
            Err(e) => {
                *billing_api_access_ok = false;
                ledger.push(format!("metering call failed: {e}"));
            }
        }
    }

    async fn archive(
        &self,
        now: DateTime<Utc>,
        dimensions: Vec<DimensionUnits>,
        usage_records_snapshot: Vec<crate::model::UsageRecord>,
        ledger: &mut ErrorLedger,
    ) {
        let mut archive = match self.storage.get_archive().await {
            Ok(a) => a,
            Err(e) => {
                ledger.push(e.to_string());
                Archive::default()
            }
        };

        archive.push(ArchiveEntry {
            billed_at: now,
            dimensions,
            usage_records_snapshot,
        });
        archive.prune(now, self.config.archive_retention_period);

        if let Err(e) = self.storage.save_archive(&archive).await {
            ledger.push(e.to_string());
        }
    }

    /// Writes `cache` then `csp_config`, in that order, so a reader never observes
    /// "billed" in csp-config before cache reflects the new window (spec.md §5). Cache
    /// write failures are always recoverable (spec.md §4.3): logged, never propagated.
    async fn persist(
        &self,
        cache: &Cache,
        ledger: &ErrorLedger,
        customer_csp_data: &Value,
        billing_api_access_ok: bool,
    ) -> Result<(), crate::error::AdapterError> {
        if let Err(e) = self.storage.save_cache(cache).await {
            tracing::warn!(target: crate::TRACING_TARGET_HEART, error = %e, "failed to persist cache");
        }

        let now = self.clock.now();

        let csp_config = CspConfig {
            timestamp: now,
            expire: expire_at(now, self.config),
            billing_api_access_ok,
            errors: ledger.entries().to_vec(),
            last_billed: cache.last_bill.as_ref().map(|b| b.metering_time),
            usage: cache.last_bill.as_ref().map(|b| b.dimensions.clone()).unwrap_or_default(),
            customer_csp_data: customer_csp_data.clone(),
            base_product: self.config.product_code.clone(),
        };

        if let Err(e) = self.storage.save_csp_config(&csp_config).await {
            tracing::error!(target: crate::TRACING_TARGET_HEART, error = %e, "failed to persist csp-config");
        }

        Ok(())
    }
}

/// `current - previous`, matched by dimension name, zero for a dimension with no prior
/// report. Used for non-cumulative heartbeat reporting.
fn delta_dimensions(current: &[DimensionUnits], previous: Option<&[DimensionUnits]>) -> Vec<DimensionUnits> {
    current
        .iter()
        .map(|d| {
            let prev_units = previous
                .and_then(|prev| prev.iter().find(|p| p.dimension == d.dimension))
                .map(|p| p.units)
                .unwrap_or(0);
            DimensionUnits::new(d.dimension.clone(), d.units.saturating_sub(prev_units))
        })
        .collect()
}
