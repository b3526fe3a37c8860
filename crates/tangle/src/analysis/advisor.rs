//! Refactor advisor: which module extraction buys the most cycle relief?
//!
//! Candidates are ranked by how many distinct canonical cycles they sit in;
//! each top candidate's removal is simulated on a pruned copy of the graph
//! and the cycle count and composite score recomputed.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::{
    analysis::pipeline::PackageAnalysis,
    config::Config,
    metrics::MetricsSnapshot,
};

#[derive(Debug, Clone, Serialize)]
pub struct RefactorCandidate {
    pub module: String,
    /// Distinct cycles this module participates in.
    pub cycles_involved: usize,
    pub post_removal_cycles: usize,
    pub post_removal_composite: f64,
    /// Percentage reduction of the original cycle count.
    pub cycle_reduction_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefactorReport {
    pub original_cycles: usize,
    pub original_composite: f64,
    pub candidates: Vec<RefactorCandidate>,
}

/// Rank extraction candidates for a package with cycles.
///
/// Returns an empty candidate list when the runtime graph is acyclic. Ties in
/// participation keep the stable module-name order of the graph.
pub fn rank_extraction_candidates(analysis: &PackageAnalysis, config: &Config) -> RefactorReport {
    let original_cycles = analysis.runtime_cycles.len();
    let original_composite = analysis.snapshot.composite;

    let mut participation: FxHashMap<_, usize> = FxHashMap::default();
    for cycle in &analysis.runtime_cycles {
        for &module in cycle {
            *participation.entry(module).or_insert(0) += 1;
        }
    }

    // Collect in id (name) order, then stable-sort by participation so ties
    // keep their input order.
    let mut ranked: Vec<_> = analysis
        .arena
        .ids()
        .filter_map(|id| participation.get(&id).map(|&count| (id, count)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(config.advisor_candidates);

    let candidates = ranked
        .into_iter()
        .map(|(module, cycles_involved)| {
            let pruned = analysis.runtime_graph.without_node(module);
            let cycles = pruned.find_cycles();
            let snapshot = MetricsSnapshot::compute(&pruned, &cycles, 0);
            RefactorCandidate {
                module: analysis.arena.name(module).to_string(),
                cycles_involved,
                post_removal_cycles: cycles.len(),
                post_removal_composite: snapshot.composite,
                cycle_reduction_pct: reduction_pct(original_cycles, cycles.len()),
            }
        })
        .collect();

    RefactorReport {
        original_cycles,
        original_composite,
        candidates,
    }
}

/// Percentage of the original cycle count removed, clamped at zero.
///
/// The detector reports back-edge cycles, not an exhaustive enumeration, so a
/// pruned graph can in principle surface cycles the full graph shadowed; that
/// must read as 0% relief, not underflow.
fn reduction_pct(original: usize, remaining: usize) -> f64 {
    if original == 0 {
        return 0.0;
    }
    original.saturating_sub(remaining) as f64 / original as f64 * 100.0
}
