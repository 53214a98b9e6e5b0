//! Stage 3: gross up sales made under atypical motivation.

use super::{money, percent, StageContext, StageOutput};
use crate::error::ValuationError;
use crate::model::{AdjustmentStage, ComplianceNote, NoteKind, StageKind};

const STAGE: StageKind = StageKind::ConditionsOfSale;

pub fn adjust(entering: f64, ctx: &StageContext<'_>) -> Result<StageOutput, ValuationError> {
    let comp = ctx.comparable;
    let discount = comp.motivation_discount.unwrap_or(0.0);

    if !(0.0..1.0).contains(&discount) {
        return Err(ValuationError::InvalidSaleConditions {
            comparable_id: comp.id.clone(),
            reason: format!("motivation discount {discount} outside [0, 1)"),
        });
    }

    if discount == 0.0 {
        if comp.arms_length {
            return Ok(StageOutput::new(AdjustmentStage::no_op(
                STAGE,
                entering,
                "arm's-length sale",
            )));
        }
        let msg = "sale not at arm's length but no motivation discount documented; unadjusted";
        return Ok(StageOutput::new(AdjustmentStage::no_op(STAGE, entering, msg)).with_notes(vec![
            ComplianceNote::new(NoteKind::UnquantifiedSaleCondition, msg).at_stage(STAGE),
        ]));
    }

    let exiting = entering / (1.0 - discount);
    let explanation = format!(
        "{} / (1 - {} motivation discount) = {} arm's-length equivalent",
        money(entering),
        percent(discount),
        money(exiting)
    );
    Ok(StageOutput::new(AdjustmentStage::new(STAGE, entering, exiting, explanation)))
}
