//! Best-effort resolution of import statements to internal module candidates.
//!
//! Resolution is syntactic: each import yields zero or more candidate dotted
//! names expressed relative to the package root. A multi-segment candidate is
//! recorded twice, as the full path and as its first segment, so aggregator
//! `__init__` re-exports still land on a discovered module. Candidates that
//! match nothing in the discovered module set are dropped downstream; they
//! are never an error.

use std::path::Path;

use indexmap::IndexSet;
use log::{debug, warn};
use ruff_python_ast::visitor::Visitor;
use ruff_python_parser::parse_module;
use ruff_python_stdlib::sys;

use crate::visitors::{ImportScanVisitor, LineIndex, RawImport};

/// Python minor version used for stdlib classification.
const PYTHON_VERSION: u8 = 38;

/// One lazy import occurrence, kept individually for the hypothesis engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LazyOccurrence {
    /// Candidate target module (root-relative dotted name).
    pub target: String,
    /// Function whose body contains the import.
    pub function: String,
    /// 1-based source line of the import statement.
    pub line: usize,
}

/// Resolved import references for one module.
#[derive(Debug, Clone, Default)]
pub struct ResolvedImports {
    /// Candidate targets imported at module scope.
    pub top_level: IndexSet<String>,
    /// Candidate targets imported inside function bodies.
    pub lazy: IndexSet<String>,
    /// Individual lazy occurrences, one per candidate target.
    pub lazy_occurrences: Vec<LazyOccurrence>,
    /// External imports classified as standard library (first segment).
    pub stdlib: IndexSet<String>,
    /// External imports that are neither internal nor stdlib.
    pub third_party: IndexSet<String>,
}

/// Extract and resolve all imports of one module.
///
/// `relative_path` is the module's file path relative to the package root;
/// `package` is the root directory's name. Malformed source degrades to an
/// empty result for this file; it never aborts the package run.
pub fn resolve_imports(source: &str, relative_path: &Path, package: &str) -> ResolvedImports {
    let parsed = match parse_module(source) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!("skipping unparsable module {}: {err}", relative_path.display());
            return ResolvedImports::default();
        }
    };

    let line_index = LineIndex::new(source);
    let mut visitor = ImportScanVisitor::new(&line_index);
    for stmt in &parsed.syntax().body {
        visitor.visit_stmt(stmt);
    }

    let dir_parts = directory_parts(relative_path);
    let mut resolved = ResolvedImports::default();
    for raw in visitor.into_imports() {
        collect_candidates(&raw, &dir_parts, package, relative_path, &mut resolved);
    }
    resolved
}

/// Directory of the module, as dotted-name parts relative to the root.
///
/// For both `sub/mod.py` and `sub/__init__.py` this is `["sub"]`, which is
/// exactly the base Python uses for a single-dot relative import.
fn directory_parts(relative_path: &Path) -> Vec<String> {
    relative_path
        .parent()
        .map(|dir| {
            dir.components()
                .filter_map(|c| c.as_os_str().to_str())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn collect_candidates(
    raw: &RawImport,
    dir_parts: &[String],
    package: &str,
    relative_path: &Path,
    resolved: &mut ResolvedImports,
) {
    let mut candidates: Vec<String> = Vec::new();

    if raw.level == 0 {
        let Some(module) = raw.module.as_deref() else {
            return;
        };
        if module == package {
            // `from package import a, b`: each member may be an internal
            // module re-exported through the root initializer.
            for member in &raw.members {
                candidates.push(member.clone());
            }
        } else if let Some(sub_path) = module.strip_prefix(package).and_then(|m| m.strip_prefix('.')) {
            push_dual(&mut candidates, sub_path);
        } else {
            classify_external(module, resolved);
            return;
        }
    } else {
        let ascend = (raw.level - 1) as usize;
        if ascend > dir_parts.len() {
            warn!(
                "relative import in {} ascends above the package root",
                relative_path.display()
            );
            return;
        }
        let base = &dir_parts[..dir_parts.len() - ascend];
        match raw.module.as_deref() {
            Some(module) => {
                let dotted = join_parts(base, module.split('.'));
                push_dual(&mut candidates, &dotted);
            }
            None => {
                // `from . import x, y`: each member is a directory-relative
                // candidate.
                for member in &raw.members {
                    let dotted = join_parts(base, std::iter::once(member.as_str()));
                    push_dual(&mut candidates, &dotted);
                }
            }
        }
    }

    for candidate in candidates {
        if candidate.is_empty() {
            continue;
        }
        match &raw.enclosing_function {
            Some(function) => {
                debug!("lazy candidate {candidate} in {}::{function}", relative_path.display());
                resolved.lazy.insert(candidate.clone());
                resolved.lazy_occurrences.push(LazyOccurrence {
                    target: candidate,
                    function: function.clone(),
                    line: raw.line,
                });
            }
            None => {
                resolved.top_level.insert(candidate);
            }
        }
    }
}

/// Record a dotted path and, when multi-segment, its first segment too.
fn push_dual(candidates: &mut Vec<String>, dotted: &str) {
    if dotted.is_empty() {
        return;
    }
    candidates.push(dotted.to_string());
    if let Some((first, rest)) = dotted.split_once('.')
        && !rest.is_empty()
    {
        candidates.push(first.to_string());
    }
}

fn join_parts<'a>(base: &'a [String], extra: impl Iterator<Item = &'a str>) -> String {
    let mut parts: Vec<&str> = base.iter().map(String::as_str).collect();
    parts.extend(extra.filter(|part| !part.is_empty()));
    parts.join(".")
}

fn classify_external(module: &str, resolved: &mut ResolvedImports) {
    let top_level = module.split('.').next().unwrap_or(module);
    if sys::is_known_standard_library(PYTHON_VERSION, top_level) {
        resolved.stdlib.insert(top_level.to_string());
    } else {
        resolved.third_party.insert(top_level.to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn resolve(source: &str, relative: &str) -> ResolvedImports {
        resolve_imports(source, &PathBuf::from(relative), "mypkg")
    }

    #[test]
    fn absolute_subpath_records_full_and_first_segment() {
        let resolved = resolve("import mypkg.sub.worker\n", "main.py");
        let targets: Vec<&str> = resolved.top_level.iter().map(String::as_str).collect();
        assert_eq!(targets, vec!["sub.worker", "sub"]);
    }

    #[test]
    fn single_segment_subpath_has_no_duplicate() {
        let resolved = resolve("from mypkg.core import run\n", "main.py");
        let targets: Vec<&str> = resolved.top_level.iter().map(String::as_str).collect();
        assert_eq!(targets, vec!["core"]);
    }

    #[test]
    fn package_root_members_become_candidates() {
        let resolved = resolve("from mypkg import api, core\n", "sub/worker.py");
        assert!(resolved.top_level.contains("api"));
        assert!(resolved.top_level.contains("core"));
    }

    #[test]
    fn relative_import_resolves_against_module_directory() {
        // sub/worker.py doing `from . import helper` -> sub.helper
        let resolved = resolve("from . import helper\n", "sub/worker.py");
        assert!(resolved.top_level.contains("sub.helper"));
        // the dual first-segment candidate is the subpackage itself
        assert!(resolved.top_level.contains("sub"));
    }

    #[test]
    fn double_dot_ascends_one_level() {
        let resolved = resolve("from ..core import boot\n", "sub/worker.py");
        let targets: Vec<&str> = resolved.top_level.iter().map(String::as_str).collect();
        assert_eq!(targets, vec!["core.boot", "core"]);
    }

    #[test]
    fn too_many_dots_is_dropped_not_fatal() {
        let resolved = resolve("from ...far import thing\n", "sub/worker.py");
        assert!(resolved.top_level.is_empty());
    }

    #[test]
    fn lazy_import_records_function_and_line() {
        let source = r#"
def load():
    from mypkg.sub import worker
"#;
        let resolved = resolve(source, "main.py");
        assert!(resolved.top_level.is_empty());
        assert!(resolved.lazy.contains("sub.worker"));
        assert_eq!(resolved.lazy_occurrences.len(), 2); // full path + first segment
        assert_eq!(resolved.lazy_occurrences[0].function, "load");
        assert_eq!(resolved.lazy_occurrences[0].line, 3);
    }

    #[test]
    fn external_imports_are_classified_not_resolved() {
        let resolved = resolve("import os\nimport requests\nfrom json import loads\n", "main.py");
        assert!(resolved.top_level.is_empty());
        assert!(resolved.stdlib.contains("os"));
        assert!(resolved.stdlib.contains("json"));
        assert!(resolved.third_party.contains("requests"));
    }

    #[test]
    fn unparsable_source_degrades_to_empty() {
        let resolved = resolve("def broken(:\n", "main.py");
        assert!(resolved.top_level.is_empty());
        assert!(resolved.lazy.is_empty());
    }

    #[test]
    fn init_module_relative_import_uses_own_directory() {
        // sub/__init__.py doing `from .worker import spin` -> sub.worker
        let resolved = resolve("from .worker import spin\n", "sub/__init__.py");
        assert!(resolved.top_level.contains("sub.worker"));
    }
}
