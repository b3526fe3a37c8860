//! End-to-end analysis of a realistic mini package.

use std::{fs, path::Path};

use pretty_assertions::assert_eq;
use tangle::{
    analysis::{LazyVerdict, analyze_package, evaluate_lazy_imports, rank_extraction_candidates},
    callgraph::build_call_graph,
    config::Config,
    metrics::Architecture,
};
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, content).expect("write module");
}

/// A small web-ish package: an aggregator `__init__`, a core/model pair with
/// a lazy back-reference, and a subpackage.
fn build_fixture(root: &Path) {
    write(
        root,
        "__init__.py",
        "from webapp.core import start\nfrom webapp.models import User\n",
    );
    write(
        root,
        "core.py",
        r#"
from webapp import models
from webapp.store.backend import connect


def start():
    connect()
    return models.User()
"#,
    );
    write(
        root,
        "models.py",
        r#"
class User:
    def save(self):
        from webapp import core

        core.start()
"#,
    );
    write(root, "store/__init__.py", "from .backend import connect\n");
    write(
        root,
        "store/backend.py",
        r#"
import json


def connect():
    return json.dumps({})
"#,
    );
    write(root, "tests/test_core.py", "from webapp import core\n");
}

#[test]
fn module_pipeline_end_to_end() {
    let tmp = TempDir::new().expect("tempdir");
    let root = tmp.path().join("webapp");
    build_fixture(&root);

    let analysis = analyze_package(&root, &Config::default()).expect("analysis");

    // tests/ is excluded; webapp is the root __init__.
    let names: Vec<&str> = analysis.modules.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["core", "models", "store", "store.backend", "webapp"]
    );

    // Static edges: webapp -> {core, models}, core -> {models, store,
    // store.backend}, store -> store.backend.
    assert_eq!(analysis.static_graph.edge_count(), 6);
    assert!(analysis.static_cycles.is_empty());

    // The lazy models -> core edge closes a cycle in the runtime graph.
    assert_eq!(analysis.runtime_cycles.len(), 1);
    assert_eq!(
        analysis.cycle_names(&analysis.runtime_cycles),
        vec![vec!["core".to_string(), "models".to_string()]]
    );
    assert!(analysis.stdlib_imports.contains("json"));

    let report = evaluate_lazy_imports(&analysis);
    assert_eq!(report.verdict, LazyVerdict::Supports);

    let advice = rank_extraction_candidates(&analysis, &Config::default());
    assert_eq!(advice.original_cycles, 1);
    assert_eq!(advice.candidates[0].post_removal_cycles, 0);
}

#[test]
fn call_graph_end_to_end() {
    let tmp = TempDir::new().expect("tempdir");
    let root = tmp.path().join("webapp");
    build_fixture(&root);

    let analysis = build_call_graph(&root, &Config::default()).expect("call graph");

    let qualified: Vec<&str> = analysis
        .functions
        .iter()
        .map(|f| f.qualified.as_str())
        .collect();
    assert!(qualified.contains(&"core.start"));
    assert!(qualified.contains(&"models.User.save"));
    assert!(qualified.contains(&"store.backend.connect"));

    // start -> connect and save -> start resolve across modules; the
    // start/save pair does not cycle because save is never called back.
    let start = analysis.arena.get("core.start").expect("core.start");
    let connect = analysis
        .arena
        .get("store.backend.connect")
        .expect("connect");
    assert!(analysis.graph.contains_edge(start, connect));
    assert!(analysis.cycles.is_empty());
}

/// Scoped PYTHONPATH override, restored when dropped.
struct PythonPathGuard {
    original: Option<String>,
}

impl PythonPathGuard {
    fn new(value: &str) -> Self {
        let original = std::env::var("PYTHONPATH").ok();
        // SAFETY: no other test in this binary reads PYTHONPATH; the original
        // value is restored by Drop.
        unsafe {
            std::env::set_var("PYTHONPATH", value);
        }
        Self { original }
    }
}

impl Drop for PythonPathGuard {
    fn drop(&mut self) {
        // SAFETY: restores the pre-test environment.
        unsafe {
            match self.original.take() {
                Some(original) => std::env::set_var("PYTHONPATH", original),
                None => std::env::remove_var("PYTHONPATH"),
            }
        }
    }
}

#[test]
fn installed_package_is_analyzable_by_bare_name() {
    let tmp = TempDir::new().expect("tempdir");
    let site = tmp.path().join("site");
    build_fixture(&site.join("webapp"));
    let _guard = PythonPathGuard::new(site.to_str().expect("utf-8 path"));

    // No such directory exists relative to the working directory; the name is
    // resolved against the module search path instead.
    let analysis =
        analyze_package(Path::new("webapp"), &Config::default()).expect("analysis by name");
    assert_eq!(analysis.package, "webapp");
    assert_eq!(analysis.root, site.join("webapp"));
    assert_eq!(analysis.runtime_cycles.len(), 1);
}

#[test]
fn small_packages_classify_as_monolith() {
    let tmp = TempDir::new().expect("tempdir");
    let root = tmp.path().join("tiny");
    write(&root, "a.py", "from tiny import b\n");
    write(&root, "b.py", "x = 1\n");

    let analysis = analyze_package(&root, &Config::default()).expect("analysis");
    assert_eq!(analysis.snapshot.architecture, Architecture::Monolith);
}
