//! Runs the six stages for one comparable and scores the result.

use salescomp_core::{ComparableSale, MarketParameters, SubjectProperty};

use crate::classify::{validate, Validation};
use crate::config::ValidationConfig;
use crate::factors::{Confidence, FactorLibrary};
use crate::model::{
    ratio, AdjustmentResult, AdjustmentStage, Classification, ComplianceNote, PipelineFailure,
    ReviewFlag, StageKind,
};
use crate::stages::{self, StageContext};

/// Run the canonical six-stage pipeline. Never fails: per-comparable errors
/// become a REJECT result carrying the failure.
pub fn run_pipeline(
    comparable: &ComparableSale,
    subject: &SubjectProperty,
    market: &MarketParameters,
    library: &FactorLibrary,
    config: &ValidationConfig,
) -> AdjustmentResult {
    apply_stages(&StageKind::ORDER, comparable, subject, market, library, config)
}

/// Run the given stage sequence. Each stage enters at the previous stage's
/// exit price, so the order changes the result.
pub fn apply_stages(
    order: &[StageKind],
    comparable: &ComparableSale,
    subject: &SubjectProperty,
    market: &MarketParameters,
    library: &FactorLibrary,
    config: &ValidationConfig,
) -> AdjustmentResult {
    let ctx = StageContext {
        comparable,
        subject,
        market,
        library,
    };

    let mut price = comparable.sale_price;
    let mut records: Vec<AdjustmentStage> = Vec::with_capacity(order.len());
    let mut notes: Vec<ComplianceNote> = Vec::new();
    let mut failure: Option<PipelineFailure> = None;

    for &kind in order {
        if let Some(ref f) = failure {
            records.push(AdjustmentStage::no_op(
                kind,
                price,
                format!("not evaluated: pipeline aborted at {}", f.stage),
            ));
            continue;
        }

        match stages::apply(kind, price, &ctx) {
            Ok(out) => {
                log::debug!(
                    "{} stage {} {}: {:.2} -> {:.2}",
                    comparable.id,
                    kind.index(),
                    kind,
                    price,
                    out.exiting_price
                );
                price = out.exiting_price;
                notes.extend(
                    out.notes
                        .into_iter()
                        .map(|n| n.at_stage(kind).for_comparable(&comparable.id)),
                );
                records.push(out.record);
            }
            Err(e) => {
                log::warn!("comparable '{}' rejected at {kind}: {e}", comparable.id);
                records.push(AdjustmentStage::no_op(kind, price, e.to_string()));
                failure = Some(PipelineFailure {
                    stage: kind,
                    message: e.to_string(),
                    error: e,
                });
            }
        }
    }

    let gross = ratio(
        records.iter().map(|s| s.dollar_delta.abs()).sum(),
        comparable.sale_price,
    );
    let net = ratio(
        records.iter().map(|s| s.dollar_delta).sum(),
        comparable.sale_price,
    );

    let validation = match failure {
        Some(ref f) => Validation {
            classification: Classification::Reject,
            weight: 0.0,
            flags: vec![ReviewFlag::PipelineFailure { stage: f.stage }],
        },
        None => validate(gross, net, &single_pair_characteristics(&records), config),
    };

    AdjustmentResult {
        comparable_id: comparable.id.clone(),
        sale_price: comparable.sale_price,
        stages: records,
        adjusted_price: price,
        gross_adjustment: gross,
        net_adjustment: net,
        classification: validation.classification,
        weight: validation.weight,
        flags: validation.flags,
        notes,
        failure,
    }
}

/// Characteristics whose non-zero adjustment rests on a single paired sale.
fn single_pair_characteristics(records: &[AdjustmentStage]) -> Vec<String> {
    let mut names: Vec<String> = records
        .iter()
        .flat_map(|s| s.line_items.iter())
        .filter(|i| i.confidence == Some(Confidence::SinglePair) && i.dollar_delta != 0.0)
        .map(|i| i.characteristic.clone())
        .collect();
    names.sort();
    names.dedup();
    names
}
