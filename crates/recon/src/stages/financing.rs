//! Stage 2: cash-equivalent conversion for below-market financing.

use salescomp_core::FinancingType;

use super::{money, percent, StageContext, StageOutput};
use crate::error::ValuationError;
use crate::finance::cash_equivalent;
use crate::model::{AdjustmentStage, StageKind};

const STAGE: StageKind = StageKind::Financing;

pub fn adjust(entering: f64, ctx: &StageContext<'_>) -> Result<StageOutput, ValuationError> {
    let no_op = |why: String| -> Result<StageOutput, ValuationError> {
        Ok(StageOutput::new(AdjustmentStage::no_op(STAGE, entering, why)))
    };

    let Some(f) = ctx.comparable.financing.as_ref() else {
        return no_op("no financing recorded; treated as cash".into());
    };

    match f.kind {
        FinancingType::Cash => return no_op("cash sale".into()),
        FinancingType::Conventional => return no_op("conventional market-rate financing".into()),
        FinancingType::SellerFinancing | FinancingType::AssumableMortgage => {}
    }

    if !f.is_below_market() {
        return no_op(format!(
            "{} at {} is not below the market rate {}",
            f.kind,
            percent(f.contract_rate),
            percent(f.market_rate)
        ));
    }

    if f.loan_amount <= 0.0 || f.term_years <= 0.0 {
        return no_op(format!("{} has no outstanding balance or term", f.kind));
    }

    let ce = cash_equivalent(
        f.loan_amount,
        f.contract_rate,
        f.market_rate,
        f.term_years,
        f.balloon_years,
    );

    let balloon_text = if ce.balloon_balance > 0.0 {
        format!(
            " plus balloon {} after {} months (PV {})",
            money(ce.balloon_balance),
            ce.months_paid,
            money(ce.pv_balloon)
        )
    } else {
        String::new()
    };

    let explanation = format!(
        "{}: {} note at {} vs market {}; {} payments of {} worth {} at market{}; benefit {} removed",
        f.kind,
        money(f.loan_amount),
        percent(f.contract_rate),
        percent(f.market_rate),
        ce.months_paid,
        money(ce.monthly_payment),
        money(ce.pv_payments),
        balloon_text,
        money(ce.benefit)
    );

    Ok(StageOutput::new(AdjustmentStage::new(
        STAGE,
        entering,
        entering - ce.benefit,
        explanation,
    )))
}
