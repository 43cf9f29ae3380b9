//! Turns `(metric, aggregated value)` into a billable dimension vector (spec.md §4.6).
//!
//! Pure mapping functions over `&UsageMetric`; `heart` is responsible for pushing a
//! returned error message into the [`crate::ledger::ErrorLedger`] and skipping the
//! billing step for that cycle, per spec.md §4.6's "skip billing this cycle" rule.

use crate::config::{ConsumptionReporting, UsageMetric};
use crate::model::DimensionUnits;

/// Maps a metric's aggregated scalar value to its configured dimension vector.
///
/// Usage records model each metric as a single non-negative integer (spec.md §3), so
/// only the scalar-input tiered path and the volume path apply here; the "vector input"
/// variant of tiered mode described in spec.md §4.6 assumes usage records carry
/// pre-split per-dimension counts, which this data model does not represent (recorded as
/// a deliberate simplification in DESIGN.md).
pub fn map_dimensions(metric: &UsageMetric, value: u64) -> Result<Vec<DimensionUnits>, String> {
    let adjusted = match &metric.min_consumption {
        Some(min) if value > 0 && value < min.count => min.count,
        _ => value,
    };

    match metric.consumption_reporting {
        ConsumptionReporting::Volume => map_volume(metric, adjusted),
        ConsumptionReporting::Tiered => Ok(map_tiered(metric, adjusted)),
    }
}

fn map_volume(metric: &UsageMetric, value: u64) -> Result<Vec<DimensionUnits>, String> {
    let mut out: Vec<DimensionUnits> = metric
        .dimensions
        .iter()
        .map(|tier| DimensionUnits::new(tier.dimension.clone(), 0))
        .collect();

    if value == 0 {
        return Ok(out);
    }

    for (i, tier) in metric.dimensions.iter().enumerate() {
        let min = tier.min.unwrap_or(0);
        let matches = match tier.max {
            Some(max) => value >= min && value <= max,
            None => value >= min,
        };
        if matches {
            out[i].units = value;
            return Ok(out);
        }
    }

    Err("no matching dimension for volume billing".to_string())
}

/// Walks tiers by cumulative threshold (`prev_max`) rather than per-tier capacity: the
/// first tier has no predecessor, so its capacity is `max - 0`, not `max - min + 1`
/// (`min` is 0 but contributes no offset).
fn map_tiered(metric: &UsageMetric, value: u64) -> Vec<DimensionUnits> {
    let last = metric.dimensions.len().saturating_sub(1);
    let mut prev_max: u64 = 0;

    metric
        .dimensions
        .iter()
        .enumerate()
        .map(|(i, tier)| {
            let units = if i == last || tier.max.is_none() {
                value.saturating_sub(prev_max)
            } else {
                let max = tier.max.expect("checked above");
                value.min(max).saturating_sub(prev_max)
            };
            if let Some(max) = tier.max {
                prev_max = max;
            }
            DimensionUnits::new(tier.dimension.clone(), units)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DimensionTier, MinConsumption};

    fn tiered_metric(bounds: &[(Option<u64>, Option<u64>)]) -> UsageMetric {
        UsageMetric {
            usage_aggregation: crate::config::UsageAggregation::Maximum,
            consumption_reporting: ConsumptionReporting::Tiered,
            min_consumption: None,
            dimensions: bounds
                .iter()
                .enumerate()
                .map(|(i, (min, max))| DimensionTier {
                    dimension: format!("D{}", i + 1),
                    min: *min,
                    max: *max,
                })
                .collect(),
        }
    }

    fn volume_metric(bounds: &[(Option<u64>, Option<u64>)]) -> UsageMetric {
        UsageMetric {
            consumption_reporting: ConsumptionReporting::Volume,
            ..tiered_metric(bounds)
        }
    }

    #[test]
    fn tiered_scalar_v150() {
        let metric = tiered_metric(&[(Some(0), Some(30)), (Some(31), Some(40)), (Some(41), None)]);
        let out = map_dimensions(&metric, 150).unwrap();
        assert_eq!(out, vec![
            DimensionUnits::new("D1", 30),
            DimensionUnits::new("D2", 10),
            DimensionUnits::new("D3", 110),
        ]);
    }

    #[test]
    fn tiered_scalar_v36() {
        let metric = tiered_metric(&[(Some(0), Some(30)), (Some(31), Some(40)), (Some(41), None)]);
        let out = map_dimensions(&metric, 36).unwrap();
        assert_eq!(out, vec![
            DimensionUnits::new("D1", 30),
            DimensionUnits::new("D2", 6),
            DimensionUnits::new("D3", 0),
        ]);
    }

    #[test]
    fn volume_v150_falls_into_unbounded_tier() {
        let metric = volume_metric(&[(Some(0), Some(30)), (Some(31), Some(40)), (Some(41), None)]);
        let out = map_dimensions(&metric, 150).unwrap();
        assert_eq!(out, vec![
            DimensionUnits::new("D1", 0),
            DimensionUnits::new("D2", 0),
            DimensionUnits::new("D3", 150),
        ]);
    }

    #[test]
    fn volume_v36_matches_middle_tier() {
        let metric = volume_metric(&[(Some(0), Some(30)), (Some(31), Some(40)), (Some(41), None)]);
        let out = map_dimensions(&metric, 36).unwrap();
        assert_eq!(out, vec![
            DimensionUnits::new("D1", 0),
            DimensionUnits::new("D2", 36),
            DimensionUnits::new("D3", 0),
        ]);
    }

    #[test]
    fn volume_zero_emits_all_zeros() {
        let metric = volume_metric(&[(Some(0), Some(30)), (Some(31), None)]);
        let out = map_dimensions(&metric, 0).unwrap();
        assert!(out.iter().all(|d| d.units == 0));
    }

    #[test]
    fn volume_below_lowest_min_is_an_error() {
        let metric = volume_metric(&[(Some(10), Some(30)), (Some(31), None)]);
        assert!(map_dimensions(&metric, 5).is_err());
    }

    #[test]
    fn min_consumption_raises_small_nonzero_values() {
        let mut metric = volume_metric(&[(Some(0), Some(30)), (Some(31), None)]);
        metric.min_consumption = Some(MinConsumption { count: 5 });
        let out = map_dimensions(&metric, 2).unwrap();
        assert_eq!(out[0].units, 5);
    }

    #[test]
    fn min_consumption_does_not_affect_zero() {
        let mut metric = volume_metric(&[(Some(0), Some(30)), (Some(31), None)]);
        metric.min_consumption = Some(MinConsumption { count: 5 });
        let out = map_dimensions(&metric, 0).unwrap();
        assert!(out.iter().all(|d| d.units == 0));
    }

    #[test]
    fn tiered_sum_equals_input_value() {
        let metric = tiered_metric(&[(Some(0), Some(30)), (Some(31), Some(40)), (Some(41), None)]);
        let out = map_dimensions(&metric, 73).unwrap();
        let sum: u64 = out.iter().map(|d| d.units).sum();
        assert_eq!(sum, 73);
    }

    #[test]
    fn volume_mode_at_most_one_nonzero_dimension() {
        let metric = volume_metric(&[(Some(0), Some(30)), (Some(31), Some(40)), (Some(41), None)]);
        let out = map_dimensions(&metric, 36).unwrap();
        assert_eq!(out.iter().filter(|d| d.units != 0).count(), 1);
    }
}
