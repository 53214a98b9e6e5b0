use std::path::PathBuf;

use salescomp_core::ValuationInput;
use salescomp_recon::config::EngineConfig;
use salescomp_recon::engine::run;
use salescomp_recon::error::ValuationError;
use salescomp_recon::model::{Classification, NoteKind, ReviewFlag, StageKind, ValuationReport};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_input(name: &str) -> ValuationInput {
    let path = fixtures_dir().join(name);
    let json = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    serde_json::from_str(&json).unwrap()
}

fn run_default(name: &str) -> ValuationReport {
    run(&EngineConfig::default(), &load_input(name)).unwrap()
}

// -------------------------------------------------------------------------
// End-to-end
// -------------------------------------------------------------------------

#[test]
fn industrial_end_to_end() {
    let report = run_default("industrial.json");
    let comp = &report.results[0];
    assert_eq!(comp.comparable_id, "comp-1");

    // Time then physical; the first four stages before time are no-ops
    for kind in [
        StageKind::PropertyRights,
        StageKind::Financing,
        StageKind::ConditionsOfSale,
        StageKind::Location,
    ] {
        assert!(comp.stage(kind).unwrap().is_no_op(), "{kind} should be a no-op");
    }
    let time = comp.stage(StageKind::MarketConditions).unwrap();
    assert!(time.dollar_delta > 100_000.0 && time.dollar_delta < 106_000.0);

    let physical = comp.stage(StageKind::Physical).unwrap();
    assert!((physical.dollar_delta + 533_062.0).abs() < 0.01);

    assert!(
        (comp.adjusted_price - 5_420_208.0).abs() < 50.0,
        "adjusted price {}",
        comp.adjusted_price
    );
    assert!((comp.gross_adjustment - 0.109).abs() < 0.001);
    assert!(comp.net_adjustment < 0.0);
    assert_eq!(comp.classification, Classification::Acceptable);
    assert_eq!(comp.weight, 1.5);
    assert!(comp.notes.is_empty());
}

#[test]
fn industrial_stage_records_chain() {
    let report = run_default("industrial.json");
    for r in &report.results {
        assert_eq!(r.stages.len(), 6);
        assert_eq!(r.stages[0].entering_price, r.sale_price);
        for (i, s) in r.stages.iter().enumerate() {
            assert_eq!(s.index as usize, i + 1);
            assert_eq!(s.stage, StageKind::ORDER[i]);
        }
        for pair in r.stages.windows(2) {
            assert_eq!(pair[0].exiting_price, pair[1].entering_price);
        }
        assert_eq!(r.stages[5].exiting_price, r.adjusted_price);
    }
}

#[test]
fn failed_comparable_is_kept_as_reject() {
    let report = run_default("industrial.json");
    assert_eq!(report.results.len(), 3);

    let failed = &report.results[2];
    assert_eq!(failed.comparable_id, "comp-3");
    assert_eq!(failed.classification, Classification::Reject);
    assert_eq!(failed.weight, 0.0);
    let failure = failed.failure.as_ref().unwrap();
    assert_eq!(failure.stage, StageKind::PropertyRights);
    assert!(matches!(
        failure.error,
        ValuationError::InvalidRightsConfiguration { ref comparable_id, .. } if comparable_id == "comp-3"
    ));

    assert_eq!(report.summary.total_comparables, 3);
    assert_eq!(report.summary.acceptable, 2);
    assert_eq!(report.summary.rejected, 1);
    assert_eq!(report.summary.failed, 1);
    assert!(report.reconciliation.contributions.iter().all(|c| c.comparable_id != "comp-3"));
}

#[test]
fn reconciliation_weights_usable_comparables() {
    let report = run_default("industrial.json");
    let comp1 = &report.results[0];
    let comp2 = &report.results[1];
    assert_eq!(comp2.adjusted_price, 5_600_000.0);
    assert_eq!(comp2.weight, 2.0);

    let expected = (comp1.adjusted_price * 1.5 + 5_600_000.0 * 2.0) / 3.5;
    let rec = &report.reconciliation;
    assert!((rec.indicated_value - expected).abs() < 1e-6);
    assert_eq!(rec.rounded_indicated_value, (expected / 1000.0).round() * 1000.0);
    assert_eq!(rec.used.len(), 2);
    assert_eq!(rec.statistics.count, 2);
    assert!(rec.flags.is_empty());
}

#[test]
fn report_metadata_and_serialization() {
    let report = run_default("industrial.json");
    assert_eq!(report.meta.config_name, "default");
    assert_eq!(report.meta.subject_address, "1450 Logistics Pkwy");
    assert_eq!(report.meta.engine_version, env!("CARGO_PKG_VERSION"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["results"][0]["classification"], "ACCEPTABLE");
    assert_eq!(json["results"][0]["stages"][3]["stage"], "market_conditions");
    assert_eq!(json["results"][2]["flags"][0]["kind"], "pipeline_failure");
}

#[test]
fn sequential_and_parallel_agree() {
    let input = load_input("industrial.json");
    let parallel = run(&EngineConfig::default(), &input).unwrap();
    let config = EngineConfig {
        parallel: false,
        ..EngineConfig::default()
    };
    let sequential = run(&config, &input).unwrap();
    assert_eq!(parallel.results, sequential.results);
    assert_eq!(
        parallel.reconciliation.indicated_value,
        sequential.reconciliation.indicated_value
    );
}

#[test]
fn repeated_runs_are_identical() {
    let input = load_input("industrial.json");
    let config = EngineConfig::default();
    let a = run(&config, &input).unwrap();
    let b = run(&config, &input).unwrap();
    assert_eq!(a.results, b.results);
    assert_eq!(a.reconciliation, b.reconciliation);
}

// -------------------------------------------------------------------------
// Classification boundaries
// -------------------------------------------------------------------------

#[test]
fn boundary_classifications() {
    let report = run_default("boundary.json");
    let class = |id: &str| {
        report
            .results
            .iter()
            .find(|r| r.comparable_id == id)
            .unwrap()
    };

    let at_limit = class("at-limit");
    assert_eq!(at_limit.gross_adjustment, 0.25);
    assert_eq!(at_limit.classification, Classification::Acceptable);
    assert_eq!(at_limit.weight, 1.0);
    assert!(at_limit
        .flags
        .iter()
        .any(|f| matches!(f, ReviewFlag::HighNetAdjustment { .. })));

    let over = class("over-limit");
    assert!(over.gross_adjustment > 0.25);
    assert_eq!(over.classification, Classification::Caution);
    assert_eq!(over.weight, 0.5);

    let far = class("far-over");
    assert_eq!(far.classification, Classification::Reject);
    assert!(far.failure.is_none());

    assert_eq!(report.summary.flagged, 3);
}

// -------------------------------------------------------------------------
// Whole-run failures
// -------------------------------------------------------------------------

#[test]
fn insufficient_comparables_is_fatal() {
    let mut input = load_input("industrial.json");
    input.comparables.retain(|c| c.id == "comp-3");
    let err = run(&EngineConfig::default(), &input).unwrap_err();
    assert_eq!(
        err,
        ValuationError::InsufficientComparables { usable: 0, required: 1 }
    );
}

#[test]
fn no_comparables_is_fatal() {
    let mut input = load_input("industrial.json");
    input.comparables.clear();
    assert!(matches!(
        run(&EngineConfig::default(), &input),
        Err(ValuationError::InsufficientComparables { usable: 0, .. })
    ));
}

// -------------------------------------------------------------------------
// Config
// -------------------------------------------------------------------------

#[test]
fn strict_config_from_fixture() {
    let config = EngineConfig::from_path(&fixtures_dir().join("strict.toml")).unwrap();
    assert_eq!(config.name, "strict review");
    assert!(!config.parallel);
    assert_eq!(config.validation.acceptable_gross_max, 0.15);
    assert_eq!(config.reconciliation.min_usable_comparables, 2);
    assert_eq!(config.factors.len(), 2);

    let report = run(&config, &load_input("industrial.json")).unwrap();
    assert_eq!(report.meta.config_name, "strict review");
    assert_eq!(report.reconciliation.rounded_indicated_value % 5000.0, 0.0);

    // Tighter gross limit demotes both near-25% comparables to CAUTION
    let boundary = run(&config, &load_input("boundary.json")).unwrap();
    assert_eq!(boundary.summary.acceptable, 0);
    assert_eq!(boundary.summary.caution, 2);
    assert_eq!(boundary.summary.rejected, 1);
    assert_eq!(boundary.reconciliation.total_weight, 1.0);

    let mut input = load_input("boundary.json");
    input.comparables.retain(|c| c.id != "over-limit");
    assert!(matches!(
        run(&config, &input),
        Err(ValuationError::InsufficientComparables { usable: 1, required: 2 })
    ));
}

#[test]
fn config_factor_used_for_unlisted_characteristic() {
    let config = EngineConfig::from_path(&fixtures_dir().join("strict.toml")).unwrap();
    let mut input = load_input("industrial.json");
    input
        .subject
        .characteristics
        .insert("crane_capacity_tons".into(), 20.0.into());
    for c in &mut input.comparables {
        c.characteristics.insert("crane_capacity_tons".into(), 10.0.into());
    }

    let report = run(&config, &input).unwrap();
    let comp2 = &report.results[1];
    let line = comp2
        .stage(StageKind::Physical)
        .unwrap()
        .line_items
        .iter()
        .find(|i| i.characteristic == "crane_capacity_tons")
        .unwrap();
    assert_eq!(line.dollar_delta, 40_000.0);
    assert!(comp2.notes.iter().any(|n| {
        n.kind == NoteKind::IndustryDefault
            && n.characteristic.as_deref() == Some("crane_capacity_tons")
    }));
    assert_eq!(report.summary.note_counts.get("industry_default"), Some(&2));
}

#[test]
fn invalid_config_fails_before_running() {
    let config = EngineConfig::from_toml(
        r#"
[validation]
acceptable_gross_max = 0.5
caution_gross_max = 0.4
"#,
    );
    assert!(matches!(config, Err(ValuationError::ConfigValidation(_))));
}
