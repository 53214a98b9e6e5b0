//! Stage 5: location differential from the location characteristic maps.

use super::{money, percent, price_characteristics, StageContext, StageOutput};
use crate::error::ValuationError;
use crate::model::{ratio, AdjustmentStage, StageKind};

const STAGE: StageKind = StageKind::Location;

pub fn adjust(entering: f64, ctx: &StageContext<'_>) -> Result<StageOutput, ValuationError> {
    let (items, notes) = price_characteristics(
        STAGE,
        &ctx.subject.location,
        &ctx.comparable.location,
        entering,
        ctx,
    );

    let total: f64 = items.iter().map(|i| i.dollar_delta).sum();
    if total == 0.0 {
        let explanation = if items.is_empty() {
            "no location attributes reported".to_string()
        } else {
            "location equivalent to subject".to_string()
        };
        let record = AdjustmentStage::no_op(STAGE, entering, explanation).with_line_items(items);
        return Ok(StageOutput::new(record).with_notes(notes));
    }

    let explanation = format!(
        "net location differential {} ({})",
        percent(ratio(total, entering)),
        money(total)
    );
    let record =
        AdjustmentStage::new(STAGE, entering, entering + total, explanation).with_line_items(items);
    Ok(StageOutput::new(record).with_notes(notes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::FactorLibrary;
    use crate::stages::testutil;
    use salescomp_core::MarketCoefficient;

    #[test]
    fn equal_scores_no_op() {
        let mut subject = testutil::subject();
        subject.location.insert("location_score".into(), 7.0.into());
        let mut comp = testutil::comparable(1_000_000.0);
        comp.location.insert("location_score".into(), 7.0.into());
        let market = testutil::market();
        let library = FactorLibrary::with_defaults();
        let ctx = StageContext {
            comparable: &comp,
            subject: &subject,
            market: &market,
            library: &library,
        };
        let out = adjust(1_000_000.0, &ctx).unwrap();
        assert!(out.record.is_no_op());
        // Equal values need no coefficient, so no default note either
        assert!(out.notes.is_empty());
    }

    #[test]
    fn highway_frontage_premium_and_score_discount() {
        let mut subject = testutil::subject();
        subject.location.insert("highway_frontage".into(), true.into());
        subject.location.insert("location_score".into(), 6.0.into());
        let mut comp = testutil::comparable(1_000_000.0);
        comp.location.insert("highway_frontage".into(), false.into());
        comp.location.insert("location_score".into(), 7.0.into());
        let mut market = testutil::market();
        market
            .coefficients
            .insert("highway_frontage".into(), MarketCoefficient::regression(0.08));
        market
            .coefficients
            .insert("location_score".into(), MarketCoefficient::regression(0.04));
        let library = FactorLibrary::with_defaults();
        let ctx = StageContext {
            comparable: &comp,
            subject: &subject,
            market: &market,
            library: &library,
        };
        let out = adjust(1_000_000.0, &ctx).unwrap();
        // +8% frontage, -4% score => +4%
        assert!((out.record.dollar_delta - 40_000.0).abs() < 1e-6);
        assert!((out.record.percent_delta - 0.04).abs() < 1e-12);
        assert_eq!(out.record.line_items.len(), 2);
        assert!(out.notes.is_empty());
    }

    #[test]
    fn default_coefficient_noted() {
        let mut subject = testutil::subject();
        subject.location.insert("corner_lot".into(), false.into());
        let mut comp = testutil::comparable(1_000_000.0);
        comp.location.insert("corner_lot".into(), true.into());
        let market = testutil::market();
        let library = FactorLibrary::with_defaults();
        let ctx = StageContext {
            comparable: &comp,
            subject: &subject,
            market: &market,
            library: &library,
        };
        let out = adjust(1_000_000.0, &ctx).unwrap();
        assert!((out.record.dollar_delta + 30_000.0).abs() < 1e-6);
        assert_eq!(out.notes.len(), 1);
        assert_eq!(out.notes[0].stage, Some(StageKind::Location));
    }
}
