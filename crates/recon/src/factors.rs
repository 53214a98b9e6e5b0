//! Factor library: per-characteristic adjustment coefficients.
//!
//! Resolution order for a characteristic:
//! 1. named market coefficient (`MarketParameters::coefficients`)
//! 2. observed paired sales (one pair → its ratio, several → slope through origin)
//! 3. the factor's industry default
//!
//! Derived values are clamped into the factor's plausible range when one is
//! registered. Default fallbacks, clamping, and single-pair evidence each
//! produce a compliance note on the resolution.

use std::collections::BTreeMap;

use salescomp_core::{CharacteristicValue, DerivationMethod, MarketParameters, PairedSale};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::ValuationError;
use crate::model::{ComplianceNote, NoteKind};

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// How a coefficient turns a characteristic difference into dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    /// Dollars per unit of difference (optionally × a scale characteristic).
    PerUnit,
    /// Fraction of the entering price per unit of difference.
    Percent,
    /// Dollar premium for a boolean or level difference.
    Flat,
}

impl std::fmt::Display for FactorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PerUnit => write!(f, "per_unit"),
            Self::Percent => write!(f, "percent"),
            Self::Flat => write!(f, "flat"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorDefinition {
    pub name: String,
    pub kind: FactorKind,
    /// Industry-default coefficient used when no market evidence exists.
    pub default: f64,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    /// Multiply the dollar adjustment by this characteristic of the comparable,
    /// falling back to the subject's (e.g. clear height priced per foot per
    /// building square foot).
    #[serde(default)]
    pub scale_by: Option<String>,
    /// Scores for categorical values; differences are taken between scores.
    #[serde(default)]
    pub levels: BTreeMap<String, f64>,
}

impl FactorDefinition {
    pub fn new(name: &str, kind: FactorKind, default: f64) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default,
            min: None,
            max: None,
            scale_by: None,
            levels: BTreeMap::new(),
        }
    }

    pub fn bounded(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn scaled_by(mut self, characteristic: &str) -> Self {
        self.scale_by = Some(characteristic.to_string());
        self
    }

    pub fn with_levels(mut self, levels: &[(&str, f64)]) -> Self {
        self.levels = levels.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        self
    }

    /// Definition for a characteristic the library has never seen, shaped by
    /// the value type: numbers are per-unit, flags and categories are flat.
    /// The default is 0 so an unsupported characteristic adjusts nothing.
    pub fn inferred(name: &str, sample: &CharacteristicValue) -> Self {
        let kind = match sample {
            CharacteristicValue::Number(_) => FactorKind::PerUnit,
            CharacteristicValue::Flag(_) | CharacteristicValue::Category(_) => FactorKind::Flat,
        };
        Self::new(name, kind, 0.0)
    }

    pub fn validate(&self) -> Result<(), ValuationError> {
        if self.name.trim().is_empty() {
            return Err(ValuationError::ConfigValidation(
                "factor name cannot be empty".into(),
            ));
        }
        if !self.default.is_finite() {
            return Err(ValuationError::ConfigValidation(format!(
                "factor '{}': default must be finite",
                self.name
            )));
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(ValuationError::ConfigValidation(format!(
                    "factor '{}': min {min} exceeds max {max}",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Clamp into [min, max]. Returns the value and whether clamping applied.
    pub fn clamp(&self, value: f64) -> (f64, bool) {
        if let Some(min) = self.min {
            if value < min {
                return (min, true);
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return (max, true);
            }
        }
        (value, false)
    }

    pub fn level_score(&self, category: &str) -> Option<f64> {
        self.levels.get(category).copied()
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    Derived,
    IndustryDefault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    SinglePair,
    Regression,
    Default,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SinglePair => write!(f, "single_pair"),
            Self::Regression => write!(f, "regression"),
            Self::Default => write!(f, "default"),
        }
    }
}

fn confidence_for(sample_size: Option<u32>, method: DerivationMethod) -> Confidence {
    match (sample_size, method) {
        (Some(n), _) if n <= 1 => Confidence::SinglePair,
        (None, DerivationMethod::PairedSales) => Confidence::SinglePair,
        _ => Confidence::Regression,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub characteristic: String,
    pub value: f64,
    pub method: ResolutionMethod,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivation: Option<DerivationMethod>,
    /// Pre-clamp value when bounding applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unbounded_value: Option<f64>,
    pub notes: Vec<ComplianceNote>,
}

impl Resolution {
    pub fn bounded(&self) -> bool {
        self.unbounded_value.is_some()
    }
}

/// Market-derived estimate before bounding.
struct DerivedEstimate {
    value: f64,
    method: DerivationMethod,
    sample_size: Option<u32>,
}

/// Slope estimate from paired-sales observations. Pairs with zero
/// characteristic difference carry no information and are skipped.
///
/// For scaled factors the price difference is divided by the pair's `scale`
/// first, so the estimate is in the same units as the factor's default.
/// Pairs without a positive scale cannot be normalized and are skipped.
fn estimate_from_pairs<'a>(
    pairs: impl Iterator<Item = &'a PairedSale>,
    scaled: bool,
) -> Option<DerivedEstimate> {
    let usable: Vec<(f64, f64)> = pairs
        .filter(|p| p.characteristic_difference != 0.0)
        .filter_map(|p| {
            if !scaled {
                return Some((p.price_difference, p.characteristic_difference));
            }
            match p.scale {
                Some(scale) if scale > 0.0 => {
                    Some((p.price_difference / scale, p.characteristic_difference))
                }
                _ => {
                    log::debug!("paired sale for '{}' has no scale; skipped", p.characteristic);
                    None
                }
            }
        })
        .collect();

    match usable.len() {
        0 => None,
        1 => Some(DerivedEstimate {
            value: usable[0].0 / usable[0].1,
            method: DerivationMethod::PairedSales,
            sample_size: Some(1),
        }),
        n => {
            // Least squares through the origin: Σxy / Σx²
            let sxy: f64 = usable.iter().map(|(y, x)| y * x).sum();
            let sxx: f64 = usable.iter().map(|(_, x)| x.powi(2)).sum();
            Some(DerivedEstimate {
                value: sxy / sxx,
                method: DerivationMethod::PairedSales,
                sample_size: Some(n as u32),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Library
// ---------------------------------------------------------------------------

/// Coefficient definitions keyed by characteristic name.
#[derive(Debug, Clone, Default)]
pub struct FactorLibrary {
    factors: BTreeMap<String, FactorDefinition>,
}

impl FactorLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiled-in industrial defaults.
    pub fn with_defaults() -> Self {
        let mut lib = Self::new();
        let defaults = [
            // Location (percent of entering price)
            FactorDefinition::new("location_score", FactorKind::Percent, 0.05).bounded(0.01, 0.15),
            FactorDefinition::new("highway_frontage", FactorKind::Percent, 0.10).bounded(0.0, 0.25),
            FactorDefinition::new("corner_lot", FactorKind::Percent, 0.03).bounded(0.0, 0.10),
            // Physical
            FactorDefinition::new("lot_size_acres", FactorKind::PerUnit, 250_000.0)
                .bounded(25_000.0, 2_000_000.0),
            FactorDefinition::new("building_sf", FactorKind::PerUnit, 75.0).bounded(10.0, 400.0),
            FactorDefinition::new("clear_height_ft", FactorKind::PerUnit, 1.50)
                .bounded(0.50, 4.00)
                .scaled_by("building_sf"),
            FactorDefinition::new("dock_doors", FactorKind::PerUnit, 15_000.0)
                .bounded(2_500.0, 50_000.0),
            FactorDefinition::new("effective_age_years", FactorKind::Percent, -0.01)
                .bounded(-0.03, -0.002),
            FactorDefinition::new("condition_score", FactorKind::Percent, 0.05).bounded(0.01, 0.15),
            FactorDefinition::new("site_utility", FactorKind::Percent, 0.03)
                .bounded(0.01, 0.08)
                .with_levels(&[
                    ("poor", 1.0),
                    ("fair", 2.0),
                    ("average", 3.0),
                    ("good", 4.0),
                    ("excellent", 5.0),
                ]),
            FactorDefinition::new("rail_spur", FactorKind::Flat, 150_000.0)
                .bounded(25_000.0, 500_000.0),
            FactorDefinition::new("sprinklered", FactorKind::Flat, 75_000.0)
                .bounded(10_000.0, 300_000.0),
        ];
        for def in defaults {
            lib.register(def);
        }
        lib
    }

    /// Defaults overlaid with the config's `[[factors]]`.
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut lib = Self::with_defaults();
        for def in &config.factors {
            if lib.register(def.clone()).is_some() {
                log::debug!("factor '{}' overridden by config", def.name);
            }
        }
        lib
    }

    /// Add or replace a definition. Returns the replaced one.
    pub fn register(&mut self, def: FactorDefinition) -> Option<FactorDefinition> {
        self.factors.insert(def.name.clone(), def)
    }

    pub fn get(&self, name: &str) -> Option<&FactorDefinition> {
        self.factors.get(name)
    }

    /// Registered definition, or one inferred from the value type.
    pub fn definition_for(&self, name: &str, sample: &CharacteristicValue) -> FactorDefinition {
        self.get(name)
            .cloned()
            .unwrap_or_else(|| FactorDefinition::inferred(name, sample))
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// Resolve the coefficient for `characteristic`.
    ///
    /// `observed` overrides the market's paired-sales list when given.
    pub fn resolve(
        &self,
        characteristic: &str,
        market: &MarketParameters,
        observed: Option<&[PairedSale]>,
    ) -> Resolution {
        let def = self.get(characteristic);
        let scaled = def.is_some_and(|d| d.scale_by.is_some());

        let derived = market
            .coefficients
            .get(characteristic)
            .map(|c| DerivedEstimate {
                value: c.value,
                method: c.method,
                sample_size: c.sample_size,
            })
            .or_else(|| match observed {
                Some(pairs) => estimate_from_pairs(pairs.iter(), scaled),
                None => estimate_from_pairs(market.pairs_for(characteristic), scaled),
            })
            .filter(|d| d.value.is_finite());

        let Some(estimate) = derived else {
            return default_resolution(characteristic, def);
        };

        let confidence = confidence_for(estimate.sample_size, estimate.method);
        let mut notes = Vec::new();

        let (value, unbounded_value) = match def {
            Some(def) => {
                let (clamped, was_clamped) = def.clamp(estimate.value);
                if was_clamped {
                    log::warn!(
                        "coefficient for '{characteristic}' {} outside [{}, {}]; clamped to {clamped}",
                        estimate.value,
                        fmt_bound(def.min),
                        fmt_bound(def.max),
                    );
                    notes.push(
                        ComplianceNote::new(
                            NoteKind::CoefficientOutOfBounds,
                            format!(
                                "{} coefficient {:.4} outside plausible range [{}, {}]; clamped to {:.4}",
                                estimate.method,
                                estimate.value,
                                fmt_bound(def.min),
                                fmt_bound(def.max),
                                clamped
                            ),
                        )
                        .for_characteristic(characteristic),
                    );
                    (clamped, Some(estimate.value))
                } else {
                    (clamped, None)
                }
            }
            None => (estimate.value, None),
        };

        if confidence == Confidence::SinglePair {
            notes.push(
                ComplianceNote::new(
                    NoteKind::SinglePairCoefficient,
                    "coefficient rests on a single paired sale; corroborate with other methods",
                )
                .for_characteristic(characteristic),
            );
        }

        Resolution {
            characteristic: characteristic.to_string(),
            value,
            method: ResolutionMethod::Derived,
            confidence,
            derivation: Some(estimate.method),
            unbounded_value,
            notes,
        }
    }
}

fn default_resolution(characteristic: &str, def: Option<&FactorDefinition>) -> Resolution {
    let (value, message) = match def {
        Some(def) => (
            def.default,
            format!("no market-derived coefficient; industry default {} applied", def.default),
        ),
        None => (
            0.0,
            "no market-derived coefficient and no registered default; no adjustment made".to_string(),
        ),
    };
    Resolution {
        characteristic: characteristic.to_string(),
        value,
        method: ResolutionMethod::IndustryDefault,
        confidence: Confidence::Default,
        derivation: None,
        unbounded_value: None,
        notes: vec![
            ComplianceNote::new(NoteKind::IndustryDefault, message)
                .for_characteristic(characteristic),
        ],
    }
}

fn fmt_bound(b: Option<f64>) -> String {
    b.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Free-function form of [`FactorLibrary::resolve`].
pub fn resolve_coefficient(
    library: &FactorLibrary,
    characteristic: &str,
    market: &MarketParameters,
    observed: Option<&[PairedSale]>,
) -> Resolution {
    library.resolve(characteristic, market, observed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use salescomp_core::MarketCoefficient;

    fn market() -> MarketParameters {
        MarketParameters {
            valuation_date: "2020-02-01".into(),
            annual_appreciation_rate: 0.05,
            cap_rate: 0.065,
            coefficients: BTreeMap::new(),
            paired_sales: Vec::new(),
        }
    }

    fn pair(characteristic: &str, dp: f64, dc: f64) -> PairedSale {
        PairedSale {
            characteristic: characteristic.into(),
            price_difference: dp,
            characteristic_difference: dc,
            scale: None,
        }
    }

    #[test]
    fn falls_back_to_industry_default() {
        let lib = FactorLibrary::with_defaults();
        let r = lib.resolve("dock_doors", &market(), None);
        assert_eq!(r.value, 15_000.0);
        assert_eq!(r.method, ResolutionMethod::IndustryDefault);
        assert_eq!(r.confidence, Confidence::Default);
        assert_eq!(r.notes.len(), 1);
        assert_eq!(r.notes[0].kind, NoteKind::IndustryDefault);
    }

    #[test]
    fn market_regression_coefficient_within_bounds() {
        let lib = FactorLibrary::with_defaults();
        let mut m = market();
        m.coefficients
            .insert("lot_size_acres".into(), MarketCoefficient::regression(300_000.0));
        let r = lib.resolve("lot_size_acres", &m, None);
        assert_eq!(r.value, 300_000.0);
        assert_eq!(r.method, ResolutionMethod::Derived);
        assert_eq!(r.confidence, Confidence::Regression);
        assert!(!r.bounded());
        assert!(r.notes.is_empty());
    }

    #[test]
    fn clear_height_clamped_to_bounds() {
        let lib = FactorLibrary::with_defaults();
        let mut m = market();
        m.coefficients
            .insert("clear_height_ft".into(), MarketCoefficient::regression(6.25));
        let r = lib.resolve("clear_height_ft", &m, None);
        assert_eq!(r.value, 4.00);
        assert_eq!(r.unbounded_value, Some(6.25));
        assert!(r.bounded());
        assert_eq!(r.notes[0].kind, NoteKind::CoefficientOutOfBounds);

        m.coefficients
            .insert("clear_height_ft".into(), MarketCoefficient::regression(0.10));
        let r = lib.resolve("clear_height_ft", &m, None);
        assert_eq!(r.value, 0.50);
    }

    #[test]
    fn single_pair_from_observations() {
        let lib = FactorLibrary::with_defaults();
        let pairs = vec![pair("dock_doors", 36_000.0, 3.0)];
        let r = lib.resolve("dock_doors", &market(), Some(&pairs));
        assert_eq!(r.value, 12_000.0);
        assert_eq!(r.confidence, Confidence::SinglePair);
        assert_eq!(r.derivation, Some(DerivationMethod::PairedSales));
        assert!(r.notes.iter().any(|n| n.kind == NoteKind::SinglePairCoefficient));
    }

    #[test]
    fn scaled_pair_normalized_by_building_area() {
        let lib = FactorLibrary::with_defaults();
        let mut m = market();
        // Two 100,000 sf buildings 4 ft apart in clear height, $500k apart
        m.paired_sales = vec![PairedSale {
            scale: Some(100_000.0),
            ..pair("clear_height_ft", 500_000.0, 4.0)
        }];
        let r = lib.resolve("clear_height_ft", &m, None);
        assert!((r.value - 1.25).abs() < 1e-12);
        assert!(!r.bounded());
        assert!(r.notes.iter().all(|n| n.kind != NoteKind::CoefficientOutOfBounds));
        assert_eq!(r.confidence, Confidence::SinglePair);

        // Several pairs of different sizes share one per-foot-per-sf rate
        m.paired_sales = vec![
            PairedSale {
                scale: Some(100_000.0),
                ..pair("clear_height_ft", 500_000.0, 4.0)
            },
            PairedSale {
                scale: Some(40_000.0),
                ..pair("clear_height_ft", 100_000.0, 2.0)
            },
        ];
        let r = lib.resolve("clear_height_ft", &m, None);
        assert!((r.value - 1.25).abs() < 1e-12);
        assert_eq!(r.confidence, Confidence::Regression);
    }

    #[test]
    fn scaled_pair_without_scale_is_skipped() {
        let lib = FactorLibrary::with_defaults();
        let mut m = market();
        m.paired_sales = vec![pair("clear_height_ft", 500_000.0, 4.0)];
        let r = lib.resolve("clear_height_ft", &m, None);
        assert_eq!(r.method, ResolutionMethod::IndustryDefault);
        assert_eq!(r.value, 1.50);
    }

    #[test]
    fn free_function_matches_library() {
        let lib = FactorLibrary::with_defaults();
        let pairs = vec![pair("rail_spur", 120_000.0, 1.0)];
        let r = resolve_coefficient(&lib, "rail_spur", &market(), Some(&pairs));
        assert_eq!(r.value, 120_000.0);
        assert_eq!(r.method, ResolutionMethod::Derived);
        assert_eq!(r, lib.resolve("rail_spur", &market(), Some(&pairs)));

        let r = resolve_coefficient(&lib, "sprinklered", &market(), None);
        assert_eq!(r.value, 75_000.0);
        assert_eq!(r.confidence, Confidence::Default);
    }

    #[test]
    fn multiple_pairs_use_slope_through_origin() {
        let lib = FactorLibrary::with_defaults();
        let mut m = market();
        m.paired_sales = vec![
            pair("dock_doors", 20_000.0, 2.0),
            pair("dock_doors", 45_000.0, 4.0),
            pair("dock_doors", 9_000.0, 0.0), // ignored: no difference
            pair("rail_spur", 100_000.0, 1.0),
        ];
        let r = lib.resolve("dock_doors", &m, None);
        // (20000*2 + 45000*4) / (4 + 16) = 220000 / 20 = 11000
        assert!((r.value - 11_000.0).abs() < 1e-9);
        assert_eq!(r.confidence, Confidence::Regression);
        assert!(r.notes.is_empty());
    }

    #[test]
    fn market_coefficient_takes_priority_over_pairs() {
        let lib = FactorLibrary::with_defaults();
        let mut m = market();
        m.coefficients
            .insert("dock_doors".into(), MarketCoefficient::paired(18_000.0, 4));
        m.paired_sales = vec![pair("dock_doors", 10_000.0, 1.0)];
        let r = lib.resolve("dock_doors", &m, None);
        assert_eq!(r.value, 18_000.0);
        assert_eq!(r.confidence, Confidence::Regression);
    }

    #[test]
    fn unregistered_characteristic() {
        let lib = FactorLibrary::with_defaults();
        let r = lib.resolve("mezzanine_sf", &market(), None);
        assert_eq!(r.value, 0.0);
        assert_eq!(r.confidence, Confidence::Default);

        let mut m = market();
        m.coefficients
            .insert("mezzanine_sf".into(), MarketCoefficient::regression(22.0));
        let r = lib.resolve("mezzanine_sf", &m, None);
        assert_eq!(r.value, 22.0);
        assert_eq!(r.method, ResolutionMethod::Derived);

        let def = lib.definition_for("mezzanine_sf", &CharacteristicValue::Number(1.0));
        assert_eq!(def.kind, FactorKind::PerUnit);
        let def = lib.definition_for("fenced_yard", &CharacteristicValue::Flag(true));
        assert_eq!(def.kind, FactorKind::Flat);
    }

    #[test]
    fn config_overrides_defaults() {
        let config = EngineConfig::from_toml(
            r#"
[[factors]]
name = "dock_doors"
kind = "per_unit"
default = 20000
min = 5000
max = 40000
"#,
        )
        .unwrap();
        let lib = FactorLibrary::from_config(&config);
        assert_eq!(lib.get("dock_doors").unwrap().default, 20_000.0);
        assert_eq!(lib.len(), FactorLibrary::with_defaults().len());
    }

    #[test]
    fn clamp_without_bounds_is_identity() {
        let def = FactorDefinition::new("x", FactorKind::PerUnit, 1.0);
        assert_eq!(def.clamp(1e9), (1e9, false));
        let def = def.bounded(0.0, 10.0);
        assert_eq!(def.clamp(-1.0), (0.0, true));
        assert_eq!(def.clamp(5.0), (5.0, false));
    }
}
