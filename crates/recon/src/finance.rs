//! Time-value helpers for the financing and market-conditions stages.
//!
//! Sign convention: amounts are positive; a loan of `pv` is repaid by
//! positive payments.

/// Level payment that amortizes `pv` over `nper` periods at `rate` per period.
pub fn payment(rate: f64, nper: f64, pv: f64) -> f64 {
    if nper <= 0.0 {
        return 0.0;
    }
    if rate == 0.0 {
        pv / nper
    } else {
        let pow = (1.0 + rate).powf(nper);
        pv * rate * pow / (pow - 1.0)
    }
}

/// Present value of `nper` level payments of `pmt` discounted at `rate`.
pub fn present_value(rate: f64, nper: f64, pmt: f64) -> f64 {
    if rate == 0.0 {
        pmt * nper
    } else {
        pmt * (1.0 - (1.0 + rate).powf(-nper)) / rate
    }
}

/// Outstanding balance after `k` payments on a loan of `pv`.
pub fn balance_after(rate: f64, nper: f64, pv: f64, k: f64) -> f64 {
    let pmt = payment(rate, nper, pv);
    if rate == 0.0 {
        (pv - pmt * k).max(0.0)
    } else {
        let pow_k = (1.0 + rate).powf(k);
        (pv * pow_k - pmt * (pow_k - 1.0) / rate).max(0.0)
    }
}

/// Compound growth of `price` at `annual_rate` over `years` (fractional, signed).
pub fn compound(price: f64, annual_rate: f64, years: f64) -> f64 {
    price * (1.0 + annual_rate).powf(years)
}

/// Breakdown of a note's cash-equivalent value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CashEquivalent {
    pub monthly_payment: f64,
    pub months_paid: f64,
    pub pv_payments: f64,
    pub balloon_balance: f64,
    pub pv_balloon: f64,
    /// What the note is worth to a lender at the market rate.
    pub value: f64,
    /// Face amount minus `value`: the buyer's financing benefit.
    pub benefit: f64,
}

/// Cash equivalent of a note: contract-rate payments (and any balloon)
/// discounted at the market rate. Rates are annual; payments are monthly.
pub fn cash_equivalent(
    loan_amount: f64,
    contract_rate: f64,
    market_rate: f64,
    term_years: f64,
    balloon_years: Option<f64>,
) -> CashEquivalent {
    // A note shorter than half a month still pays once.
    let nper = (term_years * 12.0).round().max(1.0);
    let rc = contract_rate / 12.0;
    let rm = market_rate / 12.0;
    let pmt = payment(rc, nper, loan_amount);

    let months_paid = balloon_years
        .map(|b| (b * 12.0).round())
        .filter(|&b| b > 0.0 && b < nper)
        .unwrap_or(nper);

    let pv_payments = present_value(rm, months_paid, pmt);
    let balloon_balance = if months_paid < nper {
        balance_after(rc, nper, loan_amount, months_paid)
    } else {
        0.0
    };
    let pv_balloon = balloon_balance / (1.0 + rm).powf(months_paid);
    let value = pv_payments + pv_balloon;

    CashEquivalent {
        monthly_payment: pmt,
        months_paid,
        pv_payments,
        balloon_balance,
        pv_balloon,
        value,
        benefit: loan_amount - value,
    }
}
