use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a market-supplied coefficient was estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivationMethod {
    PairedSales,
    Regression,
}

impl Default for DerivationMethod {
    fn default() -> Self {
        Self::Regression
    }
}

impl std::fmt::Display for DerivationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PairedSales => write!(f, "paired_sales"),
            Self::Regression => write!(f, "regression"),
        }
    }
}

/// A named adjustment coefficient supplied with the market parameters.
///
/// Accepts either a bare number (treated as regression-derived) or a table
/// `{ value, method, sample_size }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "CoefficientRepr")]
pub struct MarketCoefficient {
    pub value: f64,
    pub method: DerivationMethod,
    pub sample_size: Option<u32>,
}

impl MarketCoefficient {
    pub fn regression(value: f64) -> Self {
        Self {
            value,
            method: DerivationMethod::Regression,
            sample_size: None,
        }
    }

    pub fn paired(value: f64, sample_size: u32) -> Self {
        Self {
            value,
            method: DerivationMethod::PairedSales,
            sample_size: Some(sample_size),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CoefficientRepr {
    Bare(f64),
    Full {
        value: f64,
        #[serde(default)]
        method: DerivationMethod,
        #[serde(default)]
        sample_size: Option<u32>,
    },
}

impl From<CoefficientRepr> for MarketCoefficient {
    fn from(repr: CoefficientRepr) -> Self {
        match repr {
            CoefficientRepr::Bare(value) => Self::regression(value),
            CoefficientRepr::Full {
                value,
                method,
                sample_size,
            } => Self {
                value,
                method,
                sample_size,
            },
        }
    }
}

/// One paired-sales observation: two sales differing only in `characteristic`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedSale {
    pub characteristic: String,
    /// Price of the sale with more of the characteristic minus the one with less.
    pub price_difference: f64,
    /// Characteristic difference between the two sales (same orientation).
    pub characteristic_difference: f64,
    /// Size both sales share for factors priced per unit of another
    /// characteristic (e.g. `building_sf` for clear height).
    #[serde(default)]
    pub scale: Option<f64>,
}

/// Market-wide inputs for one run. Read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketParameters {
    /// Effective date of value as supplied; parsed by the time adjustment.
    pub valuation_date: String,
    #[serde(default)]
    pub annual_appreciation_rate: f64,
    #[serde(default)]
    pub cap_rate: f64,
    #[serde(default)]
    pub coefficients: BTreeMap<String, MarketCoefficient>,
    #[serde(default)]
    pub paired_sales: Vec<PairedSale>,
}

impl MarketParameters {
    /// Paired-sales observations recorded for one characteristic.
    pub fn pairs_for<'a>(
        &'a self,
        characteristic: &'a str,
    ) -> impl Iterator<Item = &'a PairedSale> + 'a {
        self.paired_sales
            .iter()
            .filter(move |p| p.characteristic == characteristic)
    }
}
