use rayon::prelude::*;
use salescomp_core::{ComparableSale, ValuationInput};

use crate::config::EngineConfig;
use crate::error::ValuationError;
use crate::evidence::{collect_notes, compute_summary};
use crate::factors::FactorLibrary;
use crate::model::{AdjustmentResult, ValuationMeta, ValuationReport};
use crate::pipeline::run_pipeline;
use crate::reconcile::reconcile_with;

/// Adjust every comparable, classify, and reconcile. Per-comparable failures
/// stay in `results` as REJECT; only configuration problems and too few
/// usable comparables fail the run.
pub fn run(
    config: &EngineConfig,
    input: &ValuationInput,
) -> Result<ValuationReport, ValuationError> {
    config.validate()?;
    let library = FactorLibrary::from_config(config);

    log::info!(
        "valuing '{}' against {} comparables (config '{}')",
        input.subject.address,
        input.comparables.len(),
        config.name
    );

    let adjust = |comp: &ComparableSale| {
        run_pipeline(
            comp,
            &input.subject,
            &input.market,
            &library,
            &config.validation,
        )
    };

    // Comparables are independent; collect keeps input order either way.
    let results: Vec<AdjustmentResult> = if config.parallel {
        input.comparables.par_iter().map(adjust).collect()
    } else {
        input.comparables.iter().map(adjust).collect()
    };

    let summary = compute_summary(&results);
    log::info!(
        "{} acceptable, {} caution, {} rejected ({} failed)",
        summary.acceptable,
        summary.caution,
        summary.rejected,
        summary.failed
    );

    let reconciliation = reconcile_with(&results, &config.reconciliation)?;
    log::info!(
        "indicated value {:.2} (rounded {:.0}) from {} comparables",
        reconciliation.indicated_value,
        reconciliation.rounded_indicated_value,
        reconciliation.used.len()
    );

    Ok(ValuationReport {
        meta: ValuationMeta {
            config_name: config.name.clone(),
            subject_address: input.subject.address.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        notes: collect_notes(&results),
        results,
        reconciliation,
    })
}
