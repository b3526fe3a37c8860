//! Hypothesis test: do lazy imports exist to break import cycles?
//!
//! For every lazy occurrence the engine asks a falsifiable question: if this
//! one edge were a module-scope import, would the static graph gain at least
//! one cycle it does not already have? Each occurrence is tested against a
//! fresh copy of the static graph, never cumulatively, so the results are
//! per-edge and independent of occurrence order.

use std::fmt;

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::{
    analysis::pipeline::PackageAnalysis,
    graph::ModuleId,
};

/// Package-level verdict over all lazy occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LazyVerdict {
    /// Every lazy import is cycle-breaking.
    Supports,
    /// Some, but not all, lazy imports are cycle-breaking.
    Partial,
    /// No internal lazy imports to test.
    NoLazy,
    /// Lazy imports exist but none break a cycle.
    Refutes,
}

impl fmt::Display for LazyVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Supports => "SUPPORTS",
            Self::Partial => "PARTIAL",
            Self::NoLazy => "NO_LAZY",
            Self::Refutes => "REFUTES",
        };
        f.write_str(label)
    }
}

/// Outcome for one lazy occurrence.
#[derive(Debug, Clone, Serialize)]
pub struct LazyOccurrenceResult {
    pub module: String,
    pub target: String,
    pub function: String,
    pub line: usize,
    /// The same edge already exists at module scope.
    pub already_static: bool,
    /// Promoting this edge to module scope would create a new cycle.
    pub cycle_breaking: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LazyImportReport {
    pub occurrences: Vec<LazyOccurrenceResult>,
    pub verdict: LazyVerdict,
}

/// Evaluate every lazy occurrence of a package against its static graph.
pub fn evaluate_lazy_imports(analysis: &PackageAnalysis) -> LazyImportReport {
    let static_cycle_set: FxHashSet<Vec<ModuleId>> =
        analysis.static_cycles.iter().cloned().collect();

    let mut occurrences = Vec::with_capacity(analysis.lazy_imports.len());
    for record in &analysis.lazy_imports {
        let (Some(source), Some(target)) = (
            analysis.arena.get(&record.module),
            analysis.arena.get(&record.target),
        ) else {
            continue;
        };

        let already_static = analysis.static_graph.contains_edge(source, target);
        let cycle_breaking = if already_static {
            false
        } else {
            let mut probe = analysis.static_graph.clone();
            probe.add_edge(source, target);
            probe
                .find_cycles()
                .into_iter()
                .any(|cycle| !static_cycle_set.contains(&cycle))
        };

        occurrences.push(LazyOccurrenceResult {
            module: record.module.clone(),
            target: record.target.clone(),
            function: record.function.clone(),
            line: record.line,
            already_static,
            cycle_breaking,
        });
    }

    let verdict = if occurrences.is_empty() {
        LazyVerdict::NoLazy
    } else if occurrences.iter().all(|o| o.cycle_breaking) {
        LazyVerdict::Supports
    } else if occurrences.iter().any(|o| o.cycle_breaking) {
        LazyVerdict::Partial
    } else {
        LazyVerdict::Refutes
    };

    LazyImportReport {
        occurrences,
        verdict,
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use tempfile::TempDir;

    use super::*;
    use crate::{analysis::pipeline::analyze_package, config::Config};

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(path, content).expect("write module");
    }

    fn analyze(build: impl FnOnce(&Path)) -> LazyImportReport {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("pkg");
        fs::create_dir_all(&root).expect("mkdir");
        build(&root);
        let analysis = analyze_package(&root, &Config::default()).expect("analysis");
        evaluate_lazy_imports(&analysis)
    }

    #[test]
    fn no_lazy_imports_yields_no_lazy() {
        let report = analyze(|root| {
            write(root, "a.py", "from pkg import b\n");
            write(root, "b.py", "x = 1\n");
        });
        assert!(report.occurrences.is_empty());
        assert_eq!(report.verdict, LazyVerdict::NoLazy);
    }

    #[test]
    fn single_cycle_breaking_lazy_import_supports() {
        // a imports b eagerly; b imports a lazily. Promoting the lazy edge
        // creates a new 2-cycle, so laziness is cycle-breaking.
        let report = analyze(|root| {
            write(root, "a.py", "from pkg import b\n");
            write(root, "b.py", "def back():\n    from pkg import a\n");
        });
        assert_eq!(report.occurrences.len(), 1);
        assert!(report.occurrences[0].cycle_breaking);
        assert!(!report.occurrences[0].already_static);
        assert_eq!(report.verdict, LazyVerdict::Supports);
    }

    #[test]
    fn lazy_import_without_cycle_refutes() {
        let report = analyze(|root| {
            write(root, "a.py", "x = 1\n");
            write(root, "b.py", "def load():\n    from pkg import a\n");
        });
        assert_eq!(report.occurrences.len(), 1);
        assert!(!report.occurrences[0].cycle_breaking);
        assert_eq!(report.verdict, LazyVerdict::Refutes);
    }

    #[test]
    fn mixed_occurrences_are_partial() {
        let report = analyze(|root| {
            write(root, "a.py", "from pkg import b\n");
            write(
                root,
                "b.py",
                "def back():\n    from pkg import a\ndef load():\n    from pkg import c\n",
            );
            write(root, "c.py", "x = 1\n");
        });
        assert_eq!(report.occurrences.len(), 2);
        assert_eq!(report.verdict, LazyVerdict::Partial);
    }

    #[test]
    fn edge_already_static_is_not_cycle_breaking() {
        let report = analyze(|root| {
            write(root, "a.py", "from pkg import b\n");
            write(
                root,
                "b.py",
                "from pkg import a\ndef again():\n    from pkg import a\n",
            );
        });
        assert_eq!(report.occurrences.len(), 1);
        assert!(report.occurrences[0].already_static);
        assert!(!report.occurrences[0].cycle_breaking);
        assert_eq!(report.verdict, LazyVerdict::Refutes);
    }
}
