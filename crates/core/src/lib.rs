//! `salescomp-core`: Input records for a sales-comparison valuation run.
//!
//! These types arrive already schema-checked from whatever front-end loaded
//! them. The engine crate reads them and never mutates them.

pub mod characteristic;
pub mod market;
pub mod property;

pub use characteristic::{CharacteristicMap, CharacteristicValue};
pub use market::{DerivationMethod, MarketCoefficient, MarketParameters, PairedSale};
pub use property::{
    ComparableSale, Financing, FinancingType, LeaseTerms, PropertyRights, SubjectProperty,
    ValuationInput,
};
