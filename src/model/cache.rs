//! The adapter's private recovery state (spec.md §3): single-writer, owned by the
//! control loop, never observed partially written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DimensionUnits, UsageRecord};

/// Record of the most recently submitted bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastBill {
    pub record_id: String,
    pub metering_time: DateTime<Utc>,
    pub dimensions: Vec<DimensionUnits>,
}

/// The adapter's private recovery state.
///
/// Invariants maintained by `heart`: `next_bill_time` is strictly in the future
/// immediately after a successful bill; `usage_records` is empty exactly when a bill has
/// just been submitted successfully for the current billing window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cache {
    pub adapter_start_time: DateTime<Utc>,
    pub next_bill_time: DateTime<Utc>,
    pub next_reporting_time: DateTime<Utc>,
    /// Ordered by `reporting_time`; cleared after a successful bill.
    pub usage_records: Vec<UsageRecord>,
    pub last_bill: Option<LastBill>,
    /// The cumulative dimension vector submitted in the most recent successful
    /// heartbeat report. Used to derive a delta when `reporting_api_is_cumulative` is
    /// false; `None` until the first heartbeat of a billing window.
    pub last_reported: Option<Vec<DimensionUnits>>,
}

impl Cache {
    pub fn new(start: DateTime<Utc>, next_bill_time: DateTime<Utc>, next_reporting_time: DateTime<Utc>) -> Self {
        Self {
            adapter_start_time: start,
            next_bill_time,
            next_reporting_time,
            usage_records: Vec::new(),
            last_bill: None,
            last_reported: None,
        }
    }
}
