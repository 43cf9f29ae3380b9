//! Clock & scheduler (spec.md §4.1).
//!
//! Produces `now()` and the pure deadline functions the control loop uses to decide
//! whether to sample, report, or bill on a given tick. Calendar arithmetic for `monthly`
//! uses real month boundaries with end-of-month clamping, not a fixed 30-day delta (Design
//! Notes in spec.md §9).

use chrono::{DateTime, Datelike, Duration as ChronoDuration, TimeZone, Utc};

use crate::config::{BillingInterval, Config};

/// Produces the current time. Abstracted so tests can supply a fixed instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that always returns the same instant, used by tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// The slack added to `query_interval` when computing csp-config's `expire` field
/// (spec.md §4.1).
pub const EXPIRE_SLACK_SECONDS: i64 = 30;

/// Next time the Usage Collector should sample.
pub fn next_query_deadline(now: DateTime<Utc>, config: &Config) -> DateTime<Utc> {
    now + ChronoDuration::seconds(config.query_interval as i64)
}

/// Next time a heartbeat report is due.
pub fn next_report_deadline(now: DateTime<Utc>, config: &Config) -> DateTime<Utc> {
    match config.reporting_interval_seconds() {
        Some(seconds) => now + ChronoDuration::seconds(seconds as i64),
        // `monthly` billing with no fixed override and no explicit reporting_interval in
        // seconds: fall back to advancing by the billing cadence itself.
        None => next_bill_deadline(now, config),
    }
}

/// Next time a bill is due, given the configured billing interval.
pub fn next_bill_deadline(now: DateTime<Utc>, config: &Config) -> DateTime<Utc> {
    match config.effective_billing_interval() {
        BillingInterval::Hourly => now + ChronoDuration::hours(1),
        BillingInterval::Fixed(duration) => {
            now + ChronoDuration::from_std(duration).unwrap_or(ChronoDuration::seconds(0))
        }
        BillingInterval::Monthly => add_one_calendar_month(now),
    }
}

/// `expire` is the instant after which a reader should infer the adapter has stalled.
pub fn expire_at(now: DateTime<Utc>, config: &Config) -> DateTime<Utc> {
    now + ChronoDuration::seconds(config.query_interval as i64 + EXPIRE_SLACK_SECONDS)
}

/// Advances `now` to the same day-of-month next month, clamping to the last valid day if
/// the target month is shorter (e.g. Jan 31 -> Feb 28/29).
fn add_one_calendar_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };

    let day = now.day().min(days_in_month(year, month));

    Utc.with_ymd_and_hms(
        year,
        month,
        day,
        now.hour(),
        now.minute(),
        now.second(),
    )
    .single()
    .expect("clamped day is always valid for its month")
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
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
    use crate::config::Config;

    fn dt(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn monthly_advances_same_day() {
        let now = dt(2024, 1, 15);
        assert_eq!(add_one_calendar_month(now).day(), 15);
        assert_eq!(add_one_calendar_month(now).month(), 2);
    }

    #[test]
    fn monthly_clamps_to_month_end() {
        let now = dt(2024, 1, 31);
        let next = add_one_calendar_month(now);
        assert_eq!(next.month(), 2);
        assert_eq!(next.day(), 29); // 2024 is a leap year
    }

    #[test]
    fn monthly_wraps_year() {
        let now = dt(2024, 12, 10);
        let next = add_one_calendar_month(now);
        assert_eq!(next.year(), 2025);
        assert_eq!(next.month(), 1);
    }

    #[test]
    fn hourly_bill_deadline_adds_one_hour() {
        let config = Config::from_yaml_str(crate::config::sample_yaml()).unwrap();
        let now = dt(2024, 1, 1);
        assert_eq!(next_bill_deadline(now, &config), now + ChronoDuration::hours(1));
    }

    #[test]
    fn expire_adds_query_interval_and_slack() {
        let config = Config::from_yaml_str(crate::config::sample_yaml()).unwrap();
        let now = dt(2024, 1, 1);
        assert_eq!(
            expire_at(now, &config),
            now + ChronoDuration::seconds(config.query_interval as i64 + EXPIRE_SLACK_SECONDS)
        );
    }
}
