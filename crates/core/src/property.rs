use serde::{Deserialize, Serialize};

use crate::characteristic::CharacteristicMap;
use crate::market::MarketParameters;

// ---------------------------------------------------------------------------
// Rights
// ---------------------------------------------------------------------------

/// Ownership interest held by the subject or conveyed in a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyRights {
    FeeSimple,
    Leasehold,
    LeasedFee,
    /// Anything the loader could not map. The rights stage refuses it.
    #[serde(other)]
    Unknown,
}

impl Default for PropertyRights {
    fn default() -> Self {
        Self::FeeSimple
    }
}

impl std::fmt::Display for PropertyRights {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FeeSimple => write!(f, "fee_simple"),
            Self::Leasehold => write!(f, "leasehold"),
            Self::LeasedFee => write!(f, "leased_fee"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Annual lease economics attached to a non-fee-simple sale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaseTerms {
    /// Annual ground rent owed by a leasehold buyer.
    #[serde(default)]
    pub ground_rent_annual: Option<f64>,
    /// Annual rent in place under the lease (leased fee).
    #[serde(default)]
    pub contract_rent_annual: Option<f64>,
    /// Annual market rent for the premises (leased fee).
    #[serde(default)]
    pub market_rent_annual: Option<f64>,
}

// ---------------------------------------------------------------------------
// Financing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancingType {
    Cash,
    Conventional,
    SellerFinancing,
    AssumableMortgage,
}

impl std::fmt::Display for FinancingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cash => write!(f, "cash"),
            Self::Conventional => write!(f, "conventional"),
            Self::SellerFinancing => write!(f, "seller_financing"),
            Self::AssumableMortgage => write!(f, "assumable_mortgage"),
        }
    }
}

/// Financing terms of a comparable sale. Rates are annual decimals (0.05 = 5%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Financing {
    #[serde(rename = "type")]
    pub kind: FinancingType,
    #[serde(default)]
    pub contract_rate: f64,
    #[serde(default)]
    pub market_rate: f64,
    /// Amortization term in years.
    #[serde(default)]
    pub term_years: f64,
    /// Balloon due date in years from sale, when earlier than full amortization.
    #[serde(default)]
    pub balloon_years: Option<f64>,
    #[serde(default)]
    pub loan_amount: f64,
}

impl Financing {
    pub fn cash() -> Self {
        Self {
            kind: FinancingType::Cash,
            contract_rate: 0.0,
            market_rate: 0.0,
            term_years: 0.0,
            balloon_years: None,
            loan_amount: 0.0,
        }
    }

    /// True for seller take-backs and assumptions carrying a note rate under market.
    pub fn is_below_market(&self) -> bool {
        matches!(
            self.kind,
            FinancingType::SellerFinancing | FinancingType::AssumableMortgage
        ) && self.contract_rate < self.market_rate
    }
}

// ---------------------------------------------------------------------------
// Subject + comparables
// ---------------------------------------------------------------------------

/// The property being valued. Baseline for every differential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectProperty {
    pub address: String,
    #[serde(default)]
    pub property_type: String,
    #[serde(default)]
    pub rights: PropertyRights,
    #[serde(default)]
    pub characteristics: CharacteristicMap,
    #[serde(default)]
    pub location: CharacteristicMap,
}

/// A closed sale used as market evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparableSale {
    pub id: String,
    #[serde(default)]
    pub address: String,
    pub sale_price: f64,
    /// Closing date as supplied; parsed by the time adjustment.
    pub sale_date: String,
    #[serde(default)]
    pub rights: PropertyRights,
    #[serde(default)]
    pub lease: LeaseTerms,
    #[serde(default = "default_arms_length")]
    pub arms_length: bool,
    /// Documented below-market motivation, as a decimal (0.10 = sold 10% under).
    #[serde(default)]
    pub motivation_discount: Option<f64>,
    #[serde(default)]
    pub financing: Option<Financing>,
    #[serde(default)]
    pub characteristics: CharacteristicMap,
    #[serde(default)]
    pub location: CharacteristicMap,
}

fn default_arms_length() -> bool {
    true
}

/// Everything one valuation run reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationInput {
    pub subject: SubjectProperty,
    pub comparables: Vec<ComparableSale>,
    pub market: MarketParameters,
}
