//! Stage 1: convert the rights conveyed to the subject's rights.
//!
//! Only conversion toward fee simple is supported. A leasehold buyer also
//! owes ground rent, so the capitalized rent is added back. A leased-fee
//! buyer is bound by the contract rent, so the capitalized shortfall against
//! market rent is added back.

use salescomp_core::PropertyRights;

use super::{money, percent, StageContext, StageOutput};
use crate::error::ValuationError;
use crate::model::{AdjustmentStage, StageKind};

const STAGE: StageKind = StageKind::PropertyRights;

pub fn adjust(entering: f64, ctx: &StageContext<'_>) -> Result<StageOutput, ValuationError> {
    let comp = ctx.comparable;
    let held = ctx.subject.rights;
    let conveyed = comp.rights;
    let invalid = |reason: String| ValuationError::InvalidRightsConfiguration {
        comparable_id: comp.id.clone(),
        reason,
    };

    if conveyed == PropertyRights::Unknown || held == PropertyRights::Unknown {
        return Err(invalid(format!(
            "unrecognized rights type (subject {held}, comparable {conveyed})"
        )));
    }

    if conveyed == held {
        return Ok(StageOutput::new(AdjustmentStage::no_op(
            STAGE,
            entering,
            format!("rights conveyed ({conveyed}) match subject"),
        )));
    }

    if held != PropertyRights::FeeSimple {
        return Err(invalid(format!(
            "cannot convert {conveyed} to {held}; only fee simple is a supported target"
        )));
    }

    let cap_rate = ctx.market.cap_rate;
    if !(cap_rate > 0.0) {
        return Err(invalid(format!(
            "capitalization rate must be positive to convert {conveyed}, got {cap_rate}"
        )));
    }

    let (adjustment, explanation) = match conveyed {
        PropertyRights::Leasehold => {
            let rent = comp
                .lease
                .ground_rent_annual
                .filter(|r| *r >= 0.0)
                .ok_or_else(|| invalid("leasehold sale has no annual ground rent".into()))?;
            let capitalized = rent / cap_rate;
            (
                capitalized,
                format!(
                    "leasehold: ground rent {} / cap rate {} = {} capitalized land value added for fee simple equivalent",
                    money(rent),
                    percent(cap_rate),
                    money(capitalized)
                ),
            )
        }
        PropertyRights::LeasedFee => {
            let (contract, market) = match (
                comp.lease.contract_rent_annual,
                comp.lease.market_rent_annual,
            ) {
                (Some(c), Some(m)) => (c, m),
                _ => {
                    return Err(invalid(
                        "leased-fee sale needs both contract and market rent".into(),
                    ))
                }
            };
            let capitalized = (market - contract) / cap_rate;
            (
                capitalized,
                format!(
                    "leased fee: (market rent {} - contract rent {}) / cap rate {} = {}",
                    money(market),
                    money(contract),
                    percent(cap_rate),
                    money(capitalized)
                ),
            )
        }
        PropertyRights::FeeSimple | PropertyRights::Unknown => {
            return Err(invalid(format!("cannot convert {conveyed} to {held}")));
        }
    };

    Ok(StageOutput::new(AdjustmentStage::new(
        STAGE,
        entering,
        entering + adjustment,
        explanation,
    )))
}
