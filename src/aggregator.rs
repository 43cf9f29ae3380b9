//! Folds a sequence of usage records into one value per metric (spec.md §4.5).
//!
//! Pure functions: same inputs always yield the same output, satisfying the idempotence
//! property in spec.md §8.

use crate::config::UsageAggregation;
use crate::error::AdapterError;
use crate::model::UsageRecord;

/// Aggregates `records` for `metric` according to `aggregation`.
///
/// `current` is implemented as "last sample" (REDESIGN FLAGS, resolving spec.md §9's
/// first open question); it rejects more than one record rather than silently behaving
/// like `maximum`, since the source's behavior past one sample is genuinely
/// unspecified.
pub fn aggregate(
    records: &[UsageRecord],
    metric: &str,
    aggregation: UsageAggregation,
) -> Result<u64, AdapterError> {
    match aggregation {
        UsageAggregation::Maximum => Ok(maximum(records, metric)),
        UsageAggregation::Average => Ok(average(records, metric)),
        UsageAggregation::Current => current(records, metric),
    }
}

fn maximum(records: &[UsageRecord], metric: &str) -> u64 {
    records.iter().map(|r| r.metric_value(metric)).max().unwrap_or(0)
}

fn average(records: &[UsageRecord], metric: &str) -> u64 {
    if records.is_empty() {
        return 0;
    }
    let sum: u64 = records.iter().map(|r| r.metric_value(metric)).sum();
    sum.div_ceil(records.len() as u64)
}

fn current(records: &[UsageRecord], metric: &str) -> Result<u64, AdapterError> {
    match records.len() {
        0 => Ok(0),
        1 => Ok(records[0].metric_value(metric)),
        _ => Err(AdapterError::Config(format!(
            "usage_aggregation \"current\" for metric \"{metric}\" is not defined for more than one sample per window"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use indexmap::IndexMap;

    fn record(metric: &str, value: u64) -> UsageRecord {
        let mut usage = IndexMap::new();
        usage.insert(metric.to_string(), value);
        UsageRecord {
            usage,
            reporting_time: Utc::now(),
            base_product: "example".into(),
        }
    }

    #[test]
    fn maximum_over_samples() {
        let records = vec![record("m", 10), record("m", 22), record("m", 17)];
        assert_eq!(aggregate(&records, "m", UsageAggregation::Maximum).unwrap(), 22);
    }

    #[test]
    fn average_rounds_up() {
        let records = vec![record("m", 10), record("m", 11), record("m", 12)];
        assert_eq!(aggregate(&records, "m", UsageAggregation::Average).unwrap(), 11);
    }

    #[test]
    fn empty_records_yield_zero() {
        assert_eq!(aggregate(&[], "m", UsageAggregation::Maximum).unwrap(), 0);
        assert_eq!(aggregate(&[], "m", UsageAggregation::Average).unwrap(), 0);
        assert_eq!(aggregate(&[], "m", UsageAggregation::Current).unwrap(), 0);
    }

    #[test]
    fn missing_metric_key_contributes_zero_to_aggregate() {
        let records = vec![record("other", 5)];
        assert_eq!(aggregate(&records, "m", UsageAggregation::Maximum).unwrap(), 0);
    }

    #[test]
    fn current_rejects_more_than_one_sample() {
        let records = vec![record("m", 1), record("m", 2)];
        assert!(aggregate(&records, "m", UsageAggregation::Current).is_err());
    }

    #[test]
    fn current_takes_single_sample() {
        let records = vec![record("m", 9)];
        assert_eq!(aggregate(&records, "m", UsageAggregation::Current).unwrap(), 9);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let records = vec![record("m", 10), record("m", 22), record("m", 17)];
        let first = aggregate(&records, "m", UsageAggregation::Maximum).unwrap();
        let second = aggregate(&records, "m", UsageAggregation::Maximum).unwrap();
        assert_eq!(first, second);
    }
}
