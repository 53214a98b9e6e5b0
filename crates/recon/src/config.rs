use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::ValuationError;
use crate::factors::FactorDefinition;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Engine tuning. Every field has a default, so an empty document is valid.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Run comparable pipelines on the rayon pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    /// Additional or overriding factor definitions.
    #[serde(default)]
    pub factors: Vec<FactorDefinition>,
}

fn default_name() -> String {
    "default".to_string()
}

fn default_parallel() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            parallel: default_parallel(),
            validation: ValidationConfig::default(),
            reconciliation: ReconciliationConfig::default(),
            factors: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation thresholds
// ---------------------------------------------------------------------------

/// Gross/net thresholds and tier weights for comparable classification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Gross ratio at or below which a comparable is ACCEPTABLE.
    pub acceptable_gross_max: f64,
    /// Gross ratio at or below which a comparable is CAUTION; above is REJECT.
    pub caution_gross_max: f64,
    /// |net| above this raises a reviewer flag.
    pub net_flag_threshold: f64,
    /// |net| below this earns `low_net_weight`.
    pub low_net_max: f64,
    /// |net| below this (and at or above `low_net_max`) earns `mid_net_weight`.
    pub mid_net_max: f64,
    pub low_net_weight: f64,
    pub mid_net_weight: f64,
    pub high_net_weight: f64,
    pub caution_weight: f64,
    /// Weight multiplier for comparables leaning on single-pair coefficients.
    pub single_pair_weight_factor: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            acceptable_gross_max: 0.25,
            caution_gross_max: 0.40,
            net_flag_threshold: 0.15,
            low_net_max: 0.05,
            mid_net_max: 0.10,
            low_net_weight: 2.0,
            mid_net_weight: 1.5,
            high_net_weight: 1.0,
            caution_weight: 0.5,
            single_pair_weight_factor: 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    pub min_usable_comparables: usize,
    /// Round the indicated value to this increment; 0 disables rounding.
    pub rounding_increment: f64,
    /// Coefficient of variation above which the result is flagged as dispersed.
    pub max_coefficient_of_variation: f64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            min_usable_comparables: 1,
            rounding_increment: 1_000.0,
            max_coefficient_of_variation: 0.15,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl EngineConfig {
    pub fn from_toml(input: &str) -> Result<Self, ValuationError> {
        let config: EngineConfig =
            toml::from_str(input).map_err(|e| ValuationError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ValuationError> {
        let input = std::fs::read_to_string(path)
            .map_err(|e| ValuationError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml(&input)
    }

    pub fn validate(&self) -> Result<(), ValuationError> {
        let v = &self.validation;

        if !(v.acceptable_gross_max > 0.0 && v.acceptable_gross_max <= v.caution_gross_max) {
            return Err(ValuationError::ConfigValidation(format!(
                "validation: need 0 < acceptable_gross_max <= caution_gross_max, got {} and {}",
                v.acceptable_gross_max, v.caution_gross_max
            )));
        }

        if !(v.low_net_max > 0.0 && v.low_net_max <= v.mid_net_max) {
            return Err(ValuationError::ConfigValidation(format!(
                "validation: need 0 < low_net_max <= mid_net_max, got {} and {}",
                v.low_net_max, v.mid_net_max
            )));
        }

        if v.net_flag_threshold <= 0.0 {
            return Err(ValuationError::ConfigValidation(
                "validation: net_flag_threshold must be positive".into(),
            ));
        }

        let weights = [
            ("low_net_weight", v.low_net_weight),
            ("mid_net_weight", v.mid_net_weight),
            ("high_net_weight", v.high_net_weight),
            ("caution_weight", v.caution_weight),
            ("single_pair_weight_factor", v.single_pair_weight_factor),
        ];
        for (name, w) in weights {
            if !w.is_finite() || w < 0.0 {
                return Err(ValuationError::ConfigValidation(format!(
                    "validation: {name} must be a non-negative number, got {w}"
                )));
            }
        }

        let r = &self.reconciliation;
        if r.min_usable_comparables == 0 {
            return Err(ValuationError::ConfigValidation(
                "reconciliation: min_usable_comparables must be at least 1".into(),
            ));
        }
        if r.rounding_increment < 0.0 {
            return Err(ValuationError::ConfigValidation(
                "reconciliation: rounding_increment cannot be negative".into(),
            ));
        }

        let mut seen = HashSet::new();
        for factor in &self.factors {
            if !seen.insert(factor.name.as_str()) {
                return Err(ValuationError::ConfigValidation(format!(
                    "factor '{}' defined more than once",
                    factor.name
                )));
            }
            factor.validate()?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
