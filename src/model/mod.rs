//! Persisted document shapes (spec.md §3).
//!
//! Field names here are part of the external contract with operator tooling — they are
//! written out verbatim by `storage` and must not be renamed without a version bump.

pub mod archive;
pub mod cache;
pub mod csp_config;
pub mod usage;

pub use archive::{Archive, ArchiveEntry};
pub use cache::{Cache, LastBill};
pub use csp_config::CspConfig;
pub use usage::UsageRecord;

use serde::{Deserialize, Serialize};

/// Units billed against a single dimension, the common currency between the dimension
/// mapper, the biller, and every persisted document that records a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionUnits {
    pub dimension: String,
    pub units: u64,
}

impl DimensionUnits {
    pub fn new(dimension: impl Into<String>, units: u64) -> Self {
        Self {
            dimension: dimension.into(),
            units,
        }
    }
}
