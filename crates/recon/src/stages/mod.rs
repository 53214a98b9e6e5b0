//! The six stage adjusters.
//!
//! Every stage has the same shape: take the running price, return the new
//! running price plus an audit record. Stages never read the raw sale price.

pub mod conditions;
pub mod financing;
pub mod location;
pub mod market_time;
pub mod physical;
pub mod rights;

use salescomp_core::{
    CharacteristicMap, CharacteristicValue, ComparableSale, MarketParameters, SubjectProperty,
};

use crate::error::ValuationError;
use crate::factors::{FactorKind, FactorLibrary, ResolutionMethod};
use crate::model::{AdjustmentStage, ComplianceNote, LineItem, NoteKind, StageKind};

/// Read-only inputs shared by every stage of one comparable's run.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    pub comparable: &'a ComparableSale,
    pub subject: &'a SubjectProperty,
    pub market: &'a MarketParameters,
    pub library: &'a FactorLibrary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput {
    pub exiting_price: f64,
    pub record: AdjustmentStage,
    pub notes: Vec<ComplianceNote>,
}

impl StageOutput {
    pub fn new(record: AdjustmentStage) -> Self {
        Self {
            exiting_price: record.exiting_price,
            record,
            notes: Vec::new(),
        }
    }

    pub fn with_notes(mut self, notes: Vec<ComplianceNote>) -> Self {
        self.notes = notes;
        self
    }
}

pub type StageFn = fn(f64, &StageContext<'_>) -> Result<StageOutput, ValuationError>;

/// Adjuster for a stage kind.
pub fn stage_fn(kind: StageKind) -> StageFn {
    match kind {
        StageKind::PropertyRights => rights::adjust,
        StageKind::Financing => financing::adjust,
        StageKind::ConditionsOfSale => conditions::adjust,
        StageKind::MarketConditions => market_time::adjust,
        StageKind::Location => location::adjust,
        StageKind::Physical => physical::adjust,
    }
}

pub fn apply(
    kind: StageKind,
    entering: f64,
    ctx: &StageContext<'_>,
) -> Result<StageOutput, ValuationError> {
    stage_fn(kind)(entering, ctx)
}

// ---------------------------------------------------------------------------
// Characteristic pricing (shared by location + physical)
// ---------------------------------------------------------------------------

/// Price every characteristic present on either side, in key order.
/// Each line item is computed against the same entering price.
pub(crate) fn price_characteristics(
    stage: StageKind,
    subject: &CharacteristicMap,
    comparable: &CharacteristicMap,
    entering: f64,
    ctx: &StageContext<'_>,
) -> (Vec<LineItem>, Vec<ComplianceNote>) {
    let mut keys: Vec<&String> = subject.keys().chain(comparable.keys()).collect();
    keys.sort();
    keys.dedup();

    let mut items = Vec::with_capacity(keys.len());
    let mut notes = Vec::new();
    for key in keys {
        let (item, mut item_notes) = price_characteristic(
            stage,
            key,
            subject.get(key),
            comparable.get(key),
            entering,
            ctx,
        );
        items.push(item);
        notes.append(&mut item_notes);
    }
    (items, notes)
}

fn zero_item(
    name: &str,
    s: Option<&CharacteristicValue>,
    c: Option<&CharacteristicValue>,
    explanation: String,
) -> LineItem {
    LineItem {
        characteristic: name.to_string(),
        subject_value: s.cloned(),
        comparable_value: c.cloned(),
        coefficient: 0.0,
        confidence: None,
        percent: None,
        dollar_delta: 0.0,
        explanation,
    }
}

fn flag_units(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn price_characteristic(
    stage: StageKind,
    name: &str,
    s: Option<&CharacteristicValue>,
    c: Option<&CharacteristicValue>,
    entering: f64,
    ctx: &StageContext<'_>,
) -> (LineItem, Vec<ComplianceNote>) {
    let note = |kind: NoteKind, msg: String| {
        ComplianceNote::new(kind, msg)
            .for_characteristic(name)
            .at_stage(stage)
    };

    let (sv, cv) = match (s, c) {
        (Some(sv), Some(cv)) => (sv, cv),
        _ => {
            let side = if s.is_none() { "subject" } else { "comparable" };
            let msg = format!("{name} not reported for {side}; no adjustment");
            return (
                zero_item(name, s, c, msg.clone()),
                vec![note(NoteKind::MissingCharacteristic, msg)],
            );
        }
    };

    if !sv.same_type(cv) {
        let msg = format!(
            "{name}: subject is a {} but comparable is a {}; no adjustment",
            sv.type_name(),
            cv.type_name()
        );
        return (
                zero_item(name, s, c, msg.clone()),
                vec![note(NoteKind::TypeMismatch, msg)],
            );
    }

    if sv == cv {
        return (zero_item(name, s, c, format!("{name}: equal ({sv})")), Vec::new());
    }

    let def = ctx.library.definition_for(name, sv);

    let units = match (sv, cv) {
        (CharacteristicValue::Number(a), CharacteristicValue::Number(b)) => a - b,
        (CharacteristicValue::Flag(a), CharacteristicValue::Flag(b)) => {
            flag_units(*a) - flag_units(*b)
        }
        (CharacteristicValue::Category(a), CharacteristicValue::Category(b)) => {
            match (def.level_score(a), def.level_score(b)) {
                (Some(sa), Some(sb)) => sa - sb,
                _ => {
                    let msg = format!("{name}: no level score for '{a}' vs '{b}'; no adjustment");
                    return (
                zero_item(name, s, c, msg.clone()),
                vec![note(NoteKind::UnscoredCategory, msg)],
            );
                }
            }
        }
        // Types checked above
        _ => 0.0,
    };

    let resolution = ctx.library.resolve(name, ctx.market, None);
    let mut notes: Vec<ComplianceNote> = resolution
        .notes
        .iter()
        .cloned()
        .map(|n| n.at_stage(stage))
        .collect();
    let coef = resolution.value;
    let source = match resolution.method {
        ResolutionMethod::Derived => resolution.confidence.to_string(),
        ResolutionMethod::IndustryDefault => "industry default".to_string(),
    };

    let (dollar_delta, percent, explanation) = match def.kind {
        FactorKind::Percent => {
            let pct = coef * units;
            (
                entering * pct,
                Some(pct),
                format!(
                    "{name}: subject {sv} vs comparable {cv}, {units:+} × {:.2}% ({source}) = {:+.2}%",
                    coef * 100.0,
                    pct * 100.0
                ),
            )
        }
        FactorKind::PerUnit | FactorKind::Flat => {
            let scale = match def.scale_by.as_deref() {
                None => 1.0,
                Some(scale_key) => {
                    let scale = ctx
                        .comparable
                        .characteristics
                        .get(scale_key)
                        .or_else(|| ctx.subject.characteristics.get(scale_key))
                        .and_then(|v| v.as_number());
                    match scale {
                        Some(v) => v,
                        None => {
                            let msg = format!(
                                "{name}: scale characteristic {scale_key} missing; no adjustment"
                            );
                            notes.push(note(NoteKind::MissingCharacteristic, msg.clone()));
                            return (zero_item(name, s, c, msg), notes);
                        }
                    }
                }
            };
            let dollars = units * coef * scale;
            let scale_text = match def.scale_by.as_deref() {
                Some(k) => format!(" × {scale} {k}"),
                None => String::new(),
            };
            (
                dollars,
                None,
                format!(
                    "{name}: subject {sv} vs comparable {cv}, {units:+} × {} ({source}){scale_text} = {}",
                    money(coef),
                    money(dollars)
                ),
            )
        }
    };

    let item = LineItem {
        characteristic: name.to_string(),
        subject_value: s.cloned(),
        comparable_value: c.cloned(),
        coefficient: coef,
        confidence: Some(resolution.confidence),
        percent,
        dollar_delta,
        explanation,
    };
    (item, notes)
}

/// `$1,234,567.89` with a leading minus for negatives.
pub(crate) fn money(v: f64) -> String {
    let sign = if v < 0.0 { "-" } else { "" };
    let cents = (v.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}${grouped}.{:02}", cents % 100)
}

pub(crate) fn percent(v: f64) -> String {
    format!("{:.2}%", v * 100.0)
}
