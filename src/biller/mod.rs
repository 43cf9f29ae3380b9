//! Submits dimension vectors to the CSP's metering API and normalizes its response
//! (spec.md §4.7).

#[cfg(feature = "http-csp")]
pub mod http;

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AdapterError;
use crate::model::DimensionUnits;

/// Normalized outcome of a metering call, after folding both the legacy string-response
/// and structured-dict-response shapes the source CSP API can return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterOutcome {
    pub status: MeterStatus,
    pub record_id: Option<String>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeterStatus {
    Ok,
    Failed,
}

/// The CSP metering capability (spec.md §6's *CSP* plugin).
pub trait MeteringClient: Send + Sync {
    fn meter_billing(
        &self,
        dimensions: &[DimensionUnits],
        product_code: &str,
        customer_csp_data: &Value,
        timestamp: DateTime<Utc>,
        dry_run: bool,
    ) -> impl Future<Output = Result<MeterOutcome, AdapterError>> + Send;

    fn get_csp_config_metadata(&self) -> impl Future<Output = Result<Value, AdapterError>> + Send;

    fn get_account_info(&self) -> impl Future<Output = Result<Value, AdapterError>> + Send;
}

impl<M: MeteringClient + Sync> MeteringClient for &M {
    async fn meter_billing(
        &self,
        dimensions: &[DimensionUnits],
        product_code: &str,
        customer_csp_data: &Value,
        timestamp: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<MeterOutcome, AdapterError> {
        (**self).meter_billing(dimensions, product_code, customer_csp_data, timestamp, dry_run).await
    }

    async fn get_csp_config_metadata(&self) -> Result<Value, AdapterError> {
        (**self).get_csp_config_metadata().await
    }

    async fn get_account_info(&self) -> Result<Value, AdapterError> {
        (**self).get_account_info().await
    }
}

/// A record of a completed, successful bill: `record_id` plus the instant it was
/// submitted, for [`crate::model::LastBill`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillResult {
    pub record_id: String,
    pub metering_time: DateTime<Utc>,
}

/// Wraps a [`MeteringClient`], translating its normalized outcome into either a
/// [`BillResult`] or a ledger-ready error message (spec.md §4.7: on failure, records an
/// error and does not clear `usage_records`).
pub struct Biller<M> {
    client: M,
}

impl<M: MeteringClient> Biller<M> {
    pub fn new(client: M) -> Self {
        Self { client }
    }

    pub async fn submit(
        &self,
        dimensions: &[DimensionUnits],
        product_code: &str,
        customer_csp_data: &Value,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<BillResult, String> {
        let outcome = self
            .client
            .meter_billing(dimensions, product_code, customer_csp_data, now, dry_run)
            .await
            .map_err(|e| e.to_string())?;

        match outcome.status {
            MeterStatus::Ok => {
                let record_id = outcome
                    .record_id
                    .ok_or_else(|| "metering call succeeded but returned no record_id".to_string())?;
                Ok(BillResult {
                    record_id,
                    metering_time: now,
                })
            }
            MeterStatus::Failed => Err(outcome
                .detail
                .unwrap_or_else(|| "metering call failed".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubClient {
        fail: AtomicBool,
    }

    impl MeteringClient for StubClient {
        async fn meter_billing(
            &self,
            _dimensions: &[DimensionUnits],
            _product_code: &str,
            _customer_csp_data: &Value,
            _timestamp: DateTime<Utc>,
            _dry_run: bool,
        ) -> Result<MeterOutcome, AdapterError> {
            if self.fail.load(Ordering::SeqCst) {
                Ok(MeterOutcome {
                    status: MeterStatus::Failed,
                    record_id: None,
                    detail: Some("csp rejected the bill".into()),
                })
            } else {
                Ok(MeterOutcome {
                    status: MeterStatus::Ok,
                    record_id: Some("rec-1".into()),
                    detail: None,
                })
            }
        }

        async fn get_csp_config_metadata(&self) -> Result<Value, AdapterError> {
            Ok(Value::Null)
        }

        async fn get_account_info(&self) -> Result<Value, AdapterError> {
            Ok(Value::Null)
        }
    }

    #[tokio::test]
    async fn successful_bill_returns_record_id() {
        let biller = Biller::new(StubClient { fail: AtomicBool::new(false) });
        let result = biller
            .submit(&[], "example-product", &Value::Null, Utc::now(), false)
            .await
            .unwrap();
        assert_eq!(result.record_id, "rec-1");
    }

    #[tokio::test]
    async fn failed_bill_surfaces_detail() {
        let biller = Biller::new(StubClient { fail: AtomicBool::new(true) });
        let err = biller
            .submit(&[], "example-product", &Value::Null, Utc::now(), false)
            .await
            .unwrap_err();
        assert_eq!(err, "csp rejected the bill");
    }

    #[tokio::test]
    async fn dry_run_is_safe_to_repeat() {
        let biller = Biller::new(StubClient { fail: AtomicBool::new(false) });
        let now = Utc::now();
        let first = biller.submit(&[], "p", &Value::Null, now, true).await.unwrap();
        let second = biller.submit(&[], "p", &Value::Null, now, true).await.unwrap();
        assert_eq!(first.record_id, second.record_id);
    }
}
