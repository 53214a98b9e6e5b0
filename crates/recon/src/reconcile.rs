//! Weighted reconciliation of adjusted prices into one indicated value.

use crate::config::ReconciliationConfig;
use crate::error::ValuationError;
use crate::model::{
    AdjustmentResult, Contribution, DescriptiveStats, ReconciliationResult, ReviewFlag,
};

/// Reconcile with default settings.
pub fn reconcile(results: &[AdjustmentResult]) -> Result<ReconciliationResult, ValuationError> {
    reconcile_with(results, &ReconciliationConfig::default())
}

/// Weighted mean of usable comparables (ACCEPTABLE or CAUTION, weight > 0).
/// REJECT results contribute nothing.
pub fn reconcile_with(
    results: &[AdjustmentResult],
    config: &ReconciliationConfig,
) -> Result<ReconciliationResult, ValuationError> {
    let used: Vec<AdjustmentResult> = results.iter().filter(|r| r.is_usable()).cloned().collect();
    let required = config.min_usable_comparables.max(1);
    if used.len() < required {
        return Err(ValuationError::InsufficientComparables {
            usable: used.len(),
            required,
        });
    }

    let total_weight: f64 = used.iter().map(|r| r.weight).sum();
    let weighted_sum: f64 = used.iter().map(|r| r.adjusted_price * r.weight).sum();
    let indicated_value = weighted_sum / total_weight;

    let contributions = used
        .iter()
        .map(|r| Contribution {
            comparable_id: r.comparable_id.clone(),
            adjusted_price: r.adjusted_price,
            weight: r.weight,
            weight_share: r.weight / total_weight,
        })
        .collect();

    let prices: Vec<f64> = used.iter().map(|r| r.adjusted_price).collect();
    let statistics = describe(&prices);

    let mut flags = Vec::new();
    if let Some(cv) = statistics.coefficient_of_variation {
        if cv > config.max_coefficient_of_variation {
            log::warn!(
                "adjusted prices disperse: coefficient of variation {:.4} exceeds {:.4}",
                cv,
                config.max_coefficient_of_variation
            );
            flags.push(ReviewFlag::HighDispersion {
                coefficient_of_variation: cv,
            });
        }
    }

    Ok(ReconciliationResult {
        used,
        contributions,
        total_weight,
        indicated_value,
        rounded_indicated_value: round_to(indicated_value, config.rounding_increment),
        statistics,
        flags,
    })
}

/// Round to the nearest multiple of `increment`; 0 leaves the value as is.
pub fn round_to(value: f64, increment: f64) -> f64 {
    if increment > 0.0 {
        (value / increment).round() * increment
    } else {
        value
    }
}

/// Population statistics over adjusted prices.
pub fn describe(values: &[f64]) -> DescriptiveStats {
    if values.is_empty() {
        return DescriptiveStats {
            count: 0,
            mean: 0.0,
            median: 0.0,
            std_dev: 0.0,
            min: 0.0,
            max: 0.0,
            p25: 0.0,
            p75: 0.0,
            coefficient_of_variation: None,
        };
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    DescriptiveStats {
        count: sorted.len(),
        mean,
        median: percentile(&sorted, 0.5),
        std_dev,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        p25: percentile(&sorted, 0.25),
        p75: percentile(&sorted, 0.75),
        coefficient_of_variation: if mean != 0.0 {
            Some(std_dev / mean)
        } else {
            None
        },
    }
}

/// Linear interpolation between closest ranks; `sorted` must be non-empty.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}
