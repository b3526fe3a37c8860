//! Full module-level pipeline: discover, resolve, build graphs, score.

use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use log::warn;
use serde::Serialize;
use thiserror::Error;

use crate::{
    config::Config,
    discovery::{DiscoveryError, discover_modules, locate_package_root},
    graph::{DepGraph, ModuleId, NameArena},
    metrics::MetricsSnapshot,
    resolver::{ResolvedImports, resolve_imports},
};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

/// One discovered module with its source size.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleInfo {
    pub name: String,
    pub path: PathBuf,
    pub lines: usize,
}

/// A lazy import occurrence whose target resolved to an internal module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LazyImportRecord {
    /// Module containing the import.
    pub module: String,
    /// Internal target module.
    pub target: String,
    /// Function whose body contains the import.
    pub function: String,
    pub line: usize,
}

/// Result of one module-level analysis run over a package.
#[derive(Debug)]
pub struct PackageAnalysis {
    pub package: String,
    pub root: PathBuf,
    pub modules: Vec<ModuleInfo>,
    pub arena: NameArena<ModuleId>,
    /// Graph built from module-scope imports only.
    pub static_graph: DepGraph<ModuleId>,
    /// Graph built from all imports, lazy included.
    pub runtime_graph: DepGraph<ModuleId>,
    pub static_cycles: Vec<Vec<ModuleId>>,
    pub runtime_cycles: Vec<Vec<ModuleId>>,
    pub static_snapshot: MetricsSnapshot,
    /// Headline snapshot, computed on the runtime graph.
    pub snapshot: MetricsSnapshot,
    /// Lazy occurrences filtered to internal targets.
    pub lazy_imports: Vec<LazyImportRecord>,
    /// External import roots seen anywhere in the package.
    pub stdlib_imports: IndexSet<String>,
    pub third_party_imports: IndexSet<String>,
}

impl PackageAnalysis {
    /// Render interned cycles as module-name sequences.
    pub fn cycle_names(&self, cycles: &[Vec<ModuleId>]) -> Vec<Vec<String>> {
        cycles
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

/// Run the module-level pipeline against one package root.
///
/// `root` is either a filesystem path or the bare name of an installed
/// package, located via [`locate_package_root`].
pub fn analyze_package(root: &Path, config: &Config) -> Result<PackageAnalysis, AnalysisError> {
    let root = locate_package_root(root)?;
    let discovered = discover_modules(&root, config)?;
    let package = root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("package")
        .to_string();

    let mut modules: Vec<ModuleInfo> = Vec::with_capacity(discovered.len());
    let mut resolved: IndexMap<String, ResolvedImports> = IndexMap::with_capacity(discovered.len());
    let mut stdlib_imports = IndexSet::new();
    let mut third_party_imports = IndexSet::new();

    for (name, path) in &discovered {
        let relative = path.strip_prefix(&root).unwrap_or(path);
        let (lines, imports) = match std::fs::read_to_string(path) {
            Ok(source) => (
                source.lines().count(),
                resolve_imports(&source, relative, &package),
            ),
            Err(err) => {
                warn!("failed to read {}: {err}", path.display());
                (0, ResolvedImports::default())
            }
        };
        stdlib_imports.extend(imports.stdlib.iter().cloned());
        third_party_imports.extend(imports.third_party.iter().cloned());
        modules.push(ModuleInfo {
            name: name.clone(),
            path: path.clone(),
            lines,
        });
        resolved.insert(name.clone(), imports);
    }

    let arena: NameArena<ModuleId> = NameArena::from_names(discovered.keys().cloned());
    let mut static_graph = DepGraph::with_nodes(arena.ids());
    let mut runtime_graph = DepGraph::with_nodes(arena.ids());
    let mut lazy_imports: Vec<LazyImportRecord> = Vec::new();

    for (name, imports) in &resolved {
        let Some(source_id) = arena.get(name) else {
            continue;
        };
        for target in &imports.top_level {
            if let Some(target_id) = arena.get(target) {
                static_graph.add_edge(source_id, target_id);
                runtime_graph.add_edge(source_id, target_id);
            }
        }
        for target in &imports.lazy {
            if let Some(target_id) = arena.get(target) {
                runtime_graph.add_edge(source_id, target_id);
            }
        }
        for occurrence in &imports.lazy_occurrences {
            if arena.get(&occurrence.target).is_some() && occurrence.target != *name {
                lazy_imports.push(LazyImportRecord {
                    module: name.clone(),
                    target: occurrence.target.clone(),
                    function: occurrence.function.clone(),
                    line: occurrence.line,
                });
            }
        }
    }

    let total_lines: usize = modules.iter().map(|m| m.lines).sum();
    let static_cycles = static_graph.find_cycles();
    let runtime_cycles = runtime_graph.find_cycles();
    let static_snapshot = MetricsSnapshot::compute(&static_graph, &static_cycles, total_lines);
    let snapshot = MetricsSnapshot::compute(&runtime_graph, &runtime_cycles, total_lines);

    Ok(PackageAnalysis {
        package,
        root,
        modules,
        arena,
        static_graph,
        runtime_graph,
        static_cycles,
        runtime_cycles,
        static_snapshot,
        snapshot,
        lazy_imports,
        stdlib_imports,
        third_party_imports,
    })
}
