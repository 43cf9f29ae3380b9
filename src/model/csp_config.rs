//! The adapter's externally readable status document (spec.md §3).
//!
//! Written last in each cycle so a reader never observes "billed" in `csp-config` before
//! the corresponding `cache` update is already durable (spec.md §5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::DimensionUnits;

/// The adapter's externally readable status document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CspConfig {
    pub timestamp: DateTime<Utc>,
    /// A reader observing `expire < now` should infer the adapter has stalled.
    pub expire: DateTime<Utc>,
    pub billing_api_access_ok: bool,
    /// Replaced wholesale each cycle from the error ledger.
    pub errors: Vec<String>,
    pub last_billed: Option<DateTime<Utc>>,
    /// Units reported in the last bill.
    pub usage: Vec<DimensionUnits>,
    /// Opaque CSP metadata blob, passed through unexamined.
    pub customer_csp_data: Value,
    pub base_product: String,
}

impl CspConfig {
    /// "Degraded" vs. "warning" per spec.md §4.8: a non-empty error list alongside
    /// `billing_api_access_ok = false` is degraded; alongside `true` it is a warning.
    pub fn is_degraded(&self) -> bool {
        !self.errors.is_empty() && !self.billing_api_access_ok
    }

    pub fn is_warning(&self) -> bool {
        !self.errors.is_empty() && self.billing_api_access_ok
    }
}
