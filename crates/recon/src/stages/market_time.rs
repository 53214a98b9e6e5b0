//! Stage 4: market conditions (time) adjustment.
//!
//! `exit = enter × (1 + rate)^years` with `years = days / 365.25`.
//! Compound, never simple. Negative rates and sales dated after the
//! valuation date both work through the same formula.

use chrono::{DateTime, NaiveDate};

use super::{money, percent, StageContext, StageOutput};
use crate::error::ValuationError;
use crate::finance::compound;
use crate::model::{AdjustmentStage, StageKind};

const STAGE: StageKind = StageKind::MarketConditions;

pub const DAYS_PER_YEAR: f64 = 365.25;

/// Accepts `2020-02-01`, `02/01/2020`, or an RFC 3339 timestamp.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%m/%d/%Y"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

/// Fractional years from `sale` to `valuation`; negative when the sale is later.
pub fn years_between(sale: NaiveDate, valuation: NaiveDate) -> f64 {
    (valuation - sale).num_days() as f64 / DAYS_PER_YEAR
}

pub fn adjust(entering: f64, ctx: &StageContext<'_>) -> Result<StageOutput, ValuationError> {
    let comp = ctx.comparable;
    let market = ctx.market;
    let date_err = |field: &str, value: &str| ValuationError::DateParse {
        comparable_id: comp.id.clone(),
        field: field.to_string(),
        value: value.to_string(),
    };

    let valuation = parse_date(&market.valuation_date)
        .ok_or_else(|| date_err("valuation_date", &market.valuation_date))?;
    let sale = parse_date(&comp.sale_date).ok_or_else(|| date_err("sale_date", &comp.sale_date))?;

    let rate = market.annual_appreciation_rate;
    if !(rate > -1.0) || !rate.is_finite() {
        return Err(ValuationError::InvalidMarketParameters {
            comparable_id: comp.id.clone(),
            reason: format!("annual appreciation rate {rate} must be greater than -100%"),
        });
    }

    let days = (valuation - sale).num_days();
    let years = years_between(sale, valuation);

    if rate == 0.0 || days == 0 {
        return Ok(StageOutput::new(AdjustmentStage::no_op(
            STAGE,
            entering,
            format!(
                "{days} days from sale {sale} to valuation {valuation} at {} per year",
                percent(rate)
            ),
        )));
    }

    let exiting = compound(entering, rate, years);
    let explanation = format!(
        "{} × (1 + {})^{years:.4} years ({days} days, {sale} to {valuation}) = {}",
        money(entering),
        percent(rate),
        money(exiting)
    );
    Ok(StageOutput::new(AdjustmentStage::new(STAGE, entering, exiting, explanation)))
}
