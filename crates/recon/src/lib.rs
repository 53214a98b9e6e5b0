//! `salescomp-recon`: Sales-comparison adjustment and reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded subject, comparables and market
//! parameters, returns adjusted, classified and reconciled results.
//! No CLI or IO dependencies beyond reading a config file.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod factors;
pub mod finance;
pub mod model;
pub mod pipeline;
pub mod reconcile;
pub mod stages;

pub use classify::{classify, Validation};
pub use config::EngineConfig;
pub use engine::run;
pub use error::ValuationError;
pub use factors::{resolve_coefficient, FactorLibrary, Resolution};
pub use model::{
    AdjustmentResult, Classification, ReconciliationResult, StageKind, ValuationReport,
};
pub use pipeline::{apply_stages, run_pipeline};
pub use reconcile::{reconcile, reconcile_with};
