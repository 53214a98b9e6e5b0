use std::collections::BTreeMap;

use crate::model::{AdjustmentResult, Classification, ComplianceNote, ValuationSummary};

/// Counts across all comparables, including rejected and failed ones.
pub fn compute_summary(results: &[AdjustmentResult]) -> ValuationSummary {
    let mut note_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut acceptable = 0;
    let mut caution = 0;
    let mut rejected = 0;
    let mut failed = 0;
    let mut flagged = 0;

    for r in results {
        match r.classification {
            Classification::Acceptable => acceptable += 1,
            Classification::Caution => caution += 1,
            Classification::Reject => rejected += 1,
        }
        if r.failure.is_some() {
            failed += 1;
        }
        if !r.flags.is_empty() {
            flagged += 1;
        }
        for n in &r.notes {
            *note_counts.entry(n.kind.to_string()).or_insert(0) += 1;
        }
    }

    ValuationSummary {
        total_comparables: results.len(),
        acceptable,
        caution,
        rejected,
        failed,
        flagged,
        note_counts,
    }
}

/// Every compliance note in comparable order.
pub fn collect_notes(results: &[AdjustmentResult]) -> Vec<ComplianceNote> {
    results.iter().flat_map(|r| r.notes.iter().cloned()).collect()
}
