use std::collections::BTreeMap;

use salescomp_core::CharacteristicValue;
use serde::Serialize;

use crate::error::ValuationError;
use crate::factors::Confidence;

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// The six adjustment stages. `ORDER` is the canonical sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    PropertyRights,
    Financing,
    ConditionsOfSale,
    MarketConditions,
    Location,
    Physical,
}

impl StageKind {
    pub const ORDER: [StageKind; 6] = [
        Self::PropertyRights,
        Self::Financing,
        Self::ConditionsOfSale,
        Self::MarketConditions,
        Self::Location,
        Self::Physical,
    ];

    /// 1-based position in the canonical order.
    pub fn index(&self) -> u8 {
        match self {
            Self::PropertyRights => 1,
            Self::Financing => 2,
            Self::ConditionsOfSale => 3,
            Self::MarketConditions => 4,
            Self::Location => 5,
            Self::Physical => 6,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::PropertyRights => "Property Rights",
            Self::Financing => "Financing Terms",
            Self::ConditionsOfSale => "Conditions of Sale",
            Self::MarketConditions => "Market Conditions",
            Self::Location => "Location",
            Self::Physical => "Physical Characteristics",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PropertyRights => write!(f, "property_rights"),
            Self::Financing => write!(f, "financing"),
            Self::ConditionsOfSale => write!(f, "conditions_of_sale"),
            Self::MarketConditions => write!(f, "market_conditions"),
            Self::Location => write!(f, "location"),
            Self::Physical => write!(f, "physical"),
        }
    }
}

/// One characteristic's contribution inside the location or physical stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub characteristic: String,
    pub subject_value: Option<CharacteristicValue>,
    pub comparable_value: Option<CharacteristicValue>,
    pub coefficient: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    /// Percentage applied to the entering price (location and percent factors).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    pub dollar_delta: f64,
    pub explanation: String,
}

/// Audit record for one stage of one comparable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustmentStage {
    pub index: u8,
    pub stage: StageKind,
    pub name: String,
    pub entering_price: f64,
    pub exiting_price: f64,
    pub dollar_delta: f64,
    /// `dollar_delta / entering_price`; 0 when the entering price is 0.
    pub percent_delta: f64,
    pub explanation: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,
}

impl AdjustmentStage {
    pub fn new(
        stage: StageKind,
        entering: f64,
        exiting: f64,
        explanation: impl Into<String>,
    ) -> Self {
        let dollar_delta = exiting - entering;
        Self {
            index: stage.index(),
            stage,
            name: stage.title().to_string(),
            entering_price: entering,
            exiting_price: exiting,
            dollar_delta,
            percent_delta: ratio(dollar_delta, entering),
            explanation: explanation.into(),
            line_items: Vec::new(),
        }
    }

    /// Zero-delta record. Still emitted so provenance always has six stages.
    pub fn no_op(stage: StageKind, price: f64, explanation: impl Into<String>) -> Self {
        Self::new(stage, price, price, explanation)
    }

    pub fn with_line_items(mut self, items: Vec<LineItem>) -> Self {
        self.line_items = items;
        self
    }

    pub fn is_no_op(&self) -> bool {
        self.dollar_delta == 0.0
    }
}

/// Division guarded against a zero denominator.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

// ---------------------------------------------------------------------------
// Notes + flags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    /// Coefficient fell back to an industry default.
    IndustryDefault,
    /// Derived coefficient clamped to its plausible range.
    CoefficientOutOfBounds,
    /// Coefficient rests on a single paired sale.
    SinglePairCoefficient,
    /// Characteristic present on only one side of the comparison.
    MissingCharacteristic,
    /// Subject and comparable carry different value types for a characteristic.
    TypeMismatch,
    /// Categorical value with no level score.
    UnscoredCategory,
    /// Non-arm's-length sale with no documented discount.
    UnquantifiedSaleCondition,
}

impl std::fmt::Display for NoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndustryDefault => write!(f, "industry_default"),
            Self::CoefficientOutOfBounds => write!(f, "coefficient_out_of_bounds"),
            Self::SinglePairCoefficient => write!(f, "single_pair_coefficient"),
            Self::MissingCharacteristic => write!(f, "missing_characteristic"),
            Self::TypeMismatch => write!(f, "type_mismatch"),
            Self::UnscoredCategory => write!(f, "unscored_category"),
            Self::UnquantifiedSaleCondition => write!(f, "unquantified_sale_condition"),
        }
    }
}

/// Methodology limitation carried to the final output for audit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceNote {
    pub kind: NoteKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparable_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<StageKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub characteristic: Option<String>,
    pub message: String,
}

impl ComplianceNote {
    pub fn new(kind: NoteKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            comparable_id: None,
            stage: None,
            characteristic: None,
            message: message.into(),
        }
    }

    pub fn for_characteristic(mut self, name: &str) -> Self {
        self.characteristic = Some(name.to_string());
        self
    }

    pub fn at_stage(mut self, stage: StageKind) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn for_comparable(mut self, id: &str) -> Self {
        self.comparable_id = Some(id.to_string());
        self
    }
}

/// Non-fatal reviewer-attention markers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReviewFlag {
    HighNetAdjustment { net_adjustment: f64 },
    SinglePairFactor { characteristics: Vec<String> },
    PipelineFailure { stage: StageKind },
    HighDispersion { coefficient_of_variation: f64 },
}

// ---------------------------------------------------------------------------
// Per-comparable result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Acceptable,
    Caution,
    Reject,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Acceptable => write!(f, "ACCEPTABLE"),
            Self::Caution => write!(f, "CAUTION"),
            Self::Reject => write!(f, "REJECT"),
        }
    }
}

/// Where and why a comparable's pipeline aborted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineFailure {
    pub stage: StageKind,
    pub message: String,
    #[serde(skip)]
    pub error: ValuationError,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustmentResult {
    pub comparable_id: String,
    pub sale_price: f64,
    pub stages: Vec<AdjustmentStage>,
    pub adjusted_price: f64,
    pub gross_adjustment: f64,
    pub net_adjustment: f64,
    pub classification: Classification,
    pub weight: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<ReviewFlag>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<ComplianceNote>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<PipelineFailure>,
}

impl AdjustmentResult {
    pub fn is_usable(&self) -> bool {
        self.weight > 0.0
    }

    pub fn stage(&self, kind: StageKind) -> Option<&AdjustmentStage> {
        self.stages.iter().find(|s| s.stage == kind)
    }

    /// Signed sum of all stage deltas.
    pub fn total_adjustment(&self) -> f64 {
        self.stages.iter().map(|s| s.dollar_delta).sum()
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub comparable_id: String,
    pub adjusted_price: f64,
    pub weight: f64,
    pub weight_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p25: f64,
    pub p75: f64,
    /// `std_dev / mean`; `None` when the mean is zero.
    pub coefficient_of_variation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationResult {
    pub used: Vec<AdjustmentResult>,
    pub contributions: Vec<Contribution>,
    pub total_weight: f64,
    pub indicated_value: f64,
    pub rounded_indicated_value: f64,
    pub statistics: DescriptiveStats,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<ReviewFlag>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationSummary {
    pub total_comparables: usize,
    pub acceptable: usize,
    pub caution: usize,
    pub rejected: usize,
    pub failed: usize,
    pub flagged: usize,
    pub note_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValuationMeta {
    pub config_name: String,
    pub subject_address: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValuationReport {
    pub meta: ValuationMeta,
    pub summary: ValuationSummary,
    /// Every comparable, rejected ones included.
    pub results: Vec<AdjustmentResult>,
    pub reconciliation: ReconciliationResult,
    pub notes: Vec<ComplianceNote>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_indices() {
        let idx: Vec<u8> = StageKind::ORDER.iter().map(|s| s.index()).collect();
        assert_eq!(idx, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(StageKind::MarketConditions.to_string(), "market_conditions");
    }

    #[test]
    fn stage_record_deltas() {
        let s = AdjustmentStage::new(
            StageKind::Financing,
            1_000_000.0,
            950_000.0,
            "cash equivalent",
        );
        assert_eq!(s.dollar_delta, -50_000.0);
        assert!((s.percent_delta + 0.05).abs() < 1e-12);
        assert_eq!(s.index, 2);
        assert_eq!(s.name, "Financing Terms");
    }

    #[test]
    fn zero_entering_price_has_zero_percent() {
        let s = AdjustmentStage::new(StageKind::Physical, 0.0, 25_000.0, "");
        assert_eq!(s.percent_delta, 0.0);
        assert_eq!(ratio(5.0, 0.0), 0.0);
    }

    #[test]
    fn note_builder() {
        let n = ComplianceNote::new(NoteKind::IndustryDefault, "no market evidence")
            .for_characteristic("dock_doors")
            .at_stage(StageKind::Physical)
            .for_comparable("c2");
        assert_eq!(n.characteristic.as_deref(), Some("dock_doors"));
        assert_eq!(n.stage, Some(StageKind::Physical));
        assert_eq!(n.comparable_id.as_deref(), Some("c2"));
        assert_eq!(n.kind.to_string(), "industry_default");
    }
}
