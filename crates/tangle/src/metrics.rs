//! Aggregate graph metrics and architecture classification.
//!
//! [`MetricsSnapshot`] is a pure function of one dependency graph plus its
//! canonical cycle list; nothing here touches the filesystem.

use std::fmt;

use serde::Serialize;

use crate::graph::{DepGraph, NodeKey};

/// Architecture-pattern label produced by the threshold decision list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Architecture {
    Monolith,
    Tangled,
    HubAndSpoke,
    Framework,
    Registry,
    Facade,
    Distributed,
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Monolith => "monolith",
            Self::Tangled => "tangled",
            Self::HubAndSpoke => "hub-and-spoke",
            Self::Framework => "framework",
            Self::Registry => "registry",
            Self::Facade => "facade",
            Self::Distributed => "distributed",
        };
        f.write_str(label)
    }
}

/// Structural metrics for one graph instance.
///
/// Recomputed fresh for every graph; never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Node count (N).
    pub modules: usize,
    /// Total edge count (K_total).
    pub edges: usize,
    /// Average out-degree (K_avg = K_total / N).
    pub avg_out_degree: f64,
    /// Maximum out-degree (K_max).
    pub max_out_degree: usize,
    /// K_max as a fraction of total edges.
    pub hub_share: f64,
    pub cycle_count: usize,
    /// K_avg * N + cycle_count.
    pub composite: f64,
    /// cycle_count + 0.1 * N.
    pub burden: f64,
    pub architecture: Architecture,
    pub total_lines: usize,
}

impl MetricsSnapshot {
    /// Compute a snapshot from a graph and its canonical cycle list.
    pub fn compute<I: NodeKey>(
        graph: &DepGraph<I>,
        cycles: &[Vec<I>],
        total_lines: usize,
    ) -> Self {
        let modules = graph.node_count();
        let edges = graph.edge_count();
        let max_out_degree = graph.max_out_degree();
        let avg_out_degree = if modules == 0 {
            0.0
        } else {
            edges as f64 / modules as f64
        };
        let hub_share = if edges == 0 {
            0.0
        } else {
            max_out_degree as f64 / edges as f64
        };
        let cycle_count = cycles.len();
        let composite = avg_out_degree * modules as f64 + cycle_count as f64;
        let burden = cycle_count as f64 + 0.1 * modules as f64;
        let architecture = classify(modules, avg_out_degree, max_out_degree, hub_share, cycle_count);

        Self {
            modules,
            edges,
            avg_out_degree,
            max_out_degree,
            hub_share,
            cycle_count,
            composite,
            burden,
            architecture,
            total_lines,
        }
    }
}

/// Fixed decision list mapping graph shape to an architecture label.
///
/// Evaluated in order, first match wins. The ordering and thresholds are the
/// published classification contract; do not reorder or tune them.
pub fn classify(
    modules: usize,
    avg_out_degree: f64,
    max_out_degree: usize,
    hub_share: f64,
    cycle_count: usize,
) -> Architecture {
    let n = modules as f64;
    if modules <= 3 {
        Architecture::Monolith
    } else if cycle_count > 3 {
        Architecture::Tangled
    } else if hub_share > 0.5 && max_out_degree as f64 > 0.3 * n {
        Architecture::HubAndSpoke
    } else if avg_out_degree > 2.0 {
        Architecture::Framework
    } else if max_out_degree as f64 > 0.4 * n {
        Architecture::Registry
    } else if hub_share > 0.3 {
        Architecture::Facade
    } else {
        Architecture::Distributed
    }
}
