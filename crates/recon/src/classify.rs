//! Comparable classification by gross and net adjustment.
//!
//! - gross ≤ acceptable max → ACCEPTABLE, weight tiered by |net|
//! - gross ≤ caution max → CAUTION
//! - otherwise → REJECT, weight 0, kept in output
//!
//! |net| above the flag threshold is reported regardless of class.

use crate::config::ValidationConfig;
use crate::model::{Classification, ReviewFlag};

#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub classification: Classification,
    pub weight: f64,
    pub flags: Vec<ReviewFlag>,
}

/// Class for a gross adjustment ratio.
pub fn classification_for(gross: f64, config: &ValidationConfig) -> Classification {
    if gross <= config.acceptable_gross_max {
        Classification::Acceptable
    } else if gross <= config.caution_gross_max {
        Classification::Caution
    } else {
        Classification::Reject
    }
}

/// Reliability weight for an ACCEPTABLE comparable: smaller |net| earns more.
pub fn tier_weight(net: f64, config: &ValidationConfig) -> f64 {
    let net = net.abs();
    if net < config.low_net_max {
        config.low_net_weight
    } else if net < config.mid_net_max {
        config.mid_net_weight
    } else {
        config.high_net_weight
    }
}

/// Classify with default thresholds.
pub fn classify(gross: f64, net: f64) -> Validation {
    classify_with(gross, net, &ValidationConfig::default())
}

pub fn classify_with(gross: f64, net: f64, config: &ValidationConfig) -> Validation {
    let classification = classification_for(gross, config);
    let weight = match classification {
        Classification::Acceptable => tier_weight(net, config),
        Classification::Caution => config.caution_weight,
        Classification::Reject => 0.0,
    };

    let mut flags = Vec::new();
    if net.abs() > config.net_flag_threshold {
        flags.push(ReviewFlag::HighNetAdjustment { net_adjustment: net });
    }

    Validation {
        classification,
        weight,
        flags,
    }
}

/// Full validation for a completed pipeline run, including the single-pair
/// discount for comparables whose adjustments rest on single-pair factors.
pub fn validate(
    gross: f64,
    net: f64,
    single_pair: &[String],
    config: &ValidationConfig,
) -> Validation {
    let mut v = classify_with(gross, net, config);
    if !single_pair.is_empty() {
        v.weight *= config.single_pair_weight_factor;
        v.flags.push(ReviewFlag::SinglePairFactor {
            characteristics: single_pair.to_vec(),
        });
    }
    v
}
