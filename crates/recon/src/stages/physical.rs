//! Stage 6: physical characteristics.
//!
//! Walks every key on either side of the comparison. A new characteristic
//! needs only a factor definition (or a market coefficient); without either it
//! resolves to a zero default and is noted.

use super::{money, price_characteristics, StageContext, StageOutput};
use crate::error::ValuationError;
use crate::model::{AdjustmentStage, StageKind};

const STAGE: StageKind = StageKind::Physical;

pub fn adjust(entering: f64, ctx: &StageContext<'_>) -> Result<StageOutput, ValuationError> {
    let (items, notes) = price_characteristics(
        STAGE,
        &ctx.subject.characteristics,
        &ctx.comparable.characteristics,
        entering,
        ctx,
    );

    let total: f64 = items.iter().map(|i| i.dollar_delta).sum();
    let adjusted = items.iter().filter(|i| i.dollar_delta != 0.0).count();

    let explanation = if items.is_empty() {
        "no physical characteristics reported".to_string()
    } else {
        format!(
            "{adjusted} of {} characteristics adjusted, net {}",
            items.len(),
            money(total)
        )
    };

    let record =
        AdjustmentStage::new(STAGE, entering, entering + total, explanation).with_line_items(items);
    Ok(StageOutput::new(record).with_notes(notes))
}
