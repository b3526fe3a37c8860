//! Function-level call graph: a second, finer-grained pipeline over the same
//! package, sharing the cycle detector and scorer with the module pipeline.
//!
//! Call-target resolution is name-based and deliberately over-approximate: a
//! bare callee name maps to every known function definition sharing that
//! name, restricted to the caller's own module when possible. Ambiguous names
//! therefore produce parallel edges, and the reported cycle count is an upper
//! bound, not an exact figure -- inflation on the order of 10-15% for call
//! chains two or more hops deep. Consumers rely on that bias direction; do
//! not try to sharpen it here.

use std::path::Path;

use indexmap::IndexMap;
use log::warn;
use ruff_python_ast::visitor::Visitor;
use ruff_python_parser::parse_module;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::{
    analysis::pipeline::AnalysisError,
    config::Config,
    discovery::{discover_modules, locate_package_root},
    graph::{DepGraph, FunctionId, NameArena},
    metrics::MetricsSnapshot,
    visitors::{FunctionScanVisitor, LineIndex, ScannedFunction},
};

/// One function definition with its fully qualified identity.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionInfo {
    /// Bare name; may collide across modules and classes.
    pub bare: String,
    /// `module[.class].function`; unique after interning.
    pub qualified: String,
    pub module: String,
    pub class: Option<String>,
    pub line: usize,
}

/// Result of the function-level pipeline.
#[derive(Debug)]
pub struct CallGraphAnalysis {
    pub functions: Vec<FunctionInfo>,
    pub arena: NameArena<FunctionId>,
    pub graph: DepGraph<FunctionId>,
    pub cycles: Vec<Vec<FunctionId>>,
    pub snapshot: MetricsSnapshot,
}

impl CallGraphAnalysis {
    pub fn cycle_names(&self) -> Vec<Vec<String>> {
        self.cycles
            .iter()
            .map(|cycle| {
                cycle
                    .iter()
                    .map(|&id| self.arena.name(id).to_string())
                    .collect()
            })
            .collect()
    }
}

/// Build the call graph for a package root, given as a path or as an
/// installed package's name.
pub fn build_call_graph(root: &Path, config: &Config) -> Result<CallGraphAnalysis, AnalysisError> {
    let root = locate_package_root(root)?;
    let discovered = discover_modules(&root, config)?;

    let mut functions: Vec<FunctionInfo> = Vec::new();
    // Calls keyed by caller position in `functions`.
    let mut calls_by_function: Vec<Vec<String>> = Vec::new();
    let mut total_lines = 0usize;

    for (module, path) in &discovered {
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                warn!("failed to read {}: {err}", path.display());
                continue;
            }
        };
        total_lines += source.lines().count();
        for scanned in scan_module(&source, path) {
            functions.push(FunctionInfo {
                bare: scanned.bare,
                qualified: format!("{module}.{}", scanned.path),
                module: module.clone(),
                class: scanned.class,
                line: scanned.line,
            });
            calls_by_function.push(scanned.calls);
        }
    }

    // Bare name -> indices of all definitions sharing it.
    let mut by_bare: FxHashMap<&str, Vec<usize>> = FxHashMap::default();
    for (idx, function) in functions.iter().enumerate() {
        by_bare.entry(function.bare.as_str()).or_default().push(idx);
    }

    let arena: NameArena<FunctionId> =
        NameArena::from_names(functions.iter().map(|f| f.qualified.clone()));
    let mut graph = DepGraph::with_nodes(arena.ids());

    for (caller_idx, calls) in calls_by_function.iter().enumerate() {
        let caller = &functions[caller_idx];
        let Some(caller_id) = arena.get(&caller.qualified) else {
            continue;
        };
        for callee in calls {
            let Some(candidates) = by_bare.get(callee.as_str()) else {
                continue;
            };
            let same_module: Vec<usize> = candidates
                .iter()
                .copied()
                .filter(|&idx| functions[idx].module == caller.module)
                .collect();
            let chosen = if same_module.is_empty() {
                candidates.as_slice()
            } else {
                same_module.as_slice()
            };
            for &target_idx in chosen {
                if let Some(target_id) = arena.get(&functions[target_idx].qualified) {
                    graph.add_edge(caller_id, target_id);
                }
            }
        }
    }

    let cycles = graph.find_cycles();
    let snapshot = MetricsSnapshot::compute(&graph, &cycles, total_lines);

    Ok(CallGraphAnalysis {
        functions,
        arena,
        graph,
        cycles,
        snapshot,
    })
}

fn scan_module(source: &str, path: &Path) -> Vec<ScannedFunction> {
    let parsed = match parse_module(source) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!("skipping unparsable module {}: {err}", path.display());
            return Vec::new();
        }
    };
    let line_index = LineIndex::new(source);
    let mut visitor = FunctionScanVisitor::new(&line_index);
    for stmt in &parsed.syntax().body {
        visitor.visit_stmt(stmt);
    }
    visitor.into_functions()
}

/// Call edges rendered as qualified-name pairs, for reporting.
pub fn edge_names(analysis: &CallGraphAnalysis) -> IndexMap<String, Vec<String>> {
    let mut edges = IndexMap::new();
    for id in analysis.graph.nodes() {
        let targets: Vec<String> = analysis
            .graph
            .neighbors(id)
            .into_iter()
            .map(|t| analysis.arena.name(t).to_string())
            .collect();
        if !targets.is_empty() {
            edges.insert(analysis.arena.name(id).to_string(), targets);
        }
    }
    edges
}
