//! Execution ordering of chosen techniques.

use std::cmp::Ordering;

use crate::plan::TechniqueSummary;

/// Returns the execution order of `chosen` as a permutation of its indices.
///
/// Stable sort by declared phase (`pre`, `core`, `post`), then category priority
/// (foundational before reasoning before the derived families before meta
/// frameworks), then final score descending.
///
/// Phase wins over category: a foundational technique precedes a meta framework
/// only when both run in the same phase.
#[must_use]
pub fn determine_execution_order(chosen: &[TechniqueSummary]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..chosen.len()).collect();
    order.sort_by(|&a, &b| compare(&chosen[a], &chosen[b]));
    order
}

fn compare(a: &TechniqueSummary, b: &TechniqueSummary) -> Ordering {
    a.phase
        .cmp(&b.phase)
        .then_with(|| a.category.priority().cmp(&b.category.priority()))
        .then_with(|| b.final_score.total_cmp(&a.final_score))
}
