//! Retained historical snapshots of billed cycles (spec.md §3), pruned by
//! `archive_retention_period` on every successful bill.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::{DimensionUnits, UsageRecord};

/// One archived billing cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub billed_at: DateTime<Utc>,
    pub dimensions: Vec<DimensionUnits>,
    pub usage_records_snapshot: Vec<UsageRecord>,
}

/// Append-mostly history of billed cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archive {
    pub entries: Vec<ArchiveEntry>,
}

impl Archive {
    pub fn push(&mut self, entry: ArchiveEntry) {
        self.entries.push(entry);
    }

    /// Drops every entry billed more than `retention_months` before `now`.
    pub fn prune(&mut self, now: DateTime<Utc>, retention_months: u32) {
        let cutoff = subtract_months(now, retention_months);
        self.entries.retain(|entry| entry.billed_at >= cutoff);
    }
}

fn subtract_months(now: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    let total_months = now.year() as i64 * 12 + now.month() as i64 - 1 - months as i64;
    let year = (total_months.div_euclid(12)) as i32;
    let month = (total_months.rem_euclid(12)) as u32 + 1;
    let day = now.day().min(days_in_month(year, month));
    Utc.with_ymd_and_hms(year, month, day, now.hour(), now.minute(), now.second())
        .single()
        .expect("clamped day is always valid for its month")
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let first_of_next = Utc.with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0).single();
    let first_of_this = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single();
    match (first_of_this, first_of_next) {
        (Some(this), Some(next)) => (next - this).num_days() as u32,
        _ => 30,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn dt(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn prunes_entries_older_than_retention() {
        let mut archive = Archive::default();
        archive.push(ArchiveEntry {
            billed_at: dt(2023, 1, 1),
            dimensions: vec![],
            usage_records_snapshot: vec![],
        });
        archive.push(ArchiveEntry {
            billed_at: dt(2024, 6, 1),
            dimensions: vec![],
            usage_records_snapshot: vec![],
        });

        archive.prune(dt(2024, 7, 1), 12);

        assert_eq!(archive.entries.len(), 1);
        assert_eq!(archive.entries[0].billed_at, dt(2024, 6, 1));
    }

    #[test]
    fn subtract_months_wraps_year_and_clamps() {
        let cutoff = subtract_months(dt(2024, 1, 31), 1);
        assert_eq!(cutoff.year(), 2023);
        assert_eq!(cutoff.month(), 12);
        assert_eq!(cutoff.day(), 31);
        assert_eq!(cutoff.hour(), 0);
    }
}
