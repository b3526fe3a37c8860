//! Module-dependency and structural-complexity analysis for Python packages.
//!
//! The engine walks a package, resolves internal imports (module-scope and
//! lazy), builds dependency graphs, detects cycles, scores structural
//! complexity, and classifies the architecture shape. On top of that sit a
//! lazy-import hypothesis test, a function-level call graph, a refactor
//! advisor, and a cross-revision snapshot differ.

pub mod analysis;
pub mod callgraph;
pub mod config;
pub mod diff;
pub mod discovery;
pub mod graph;
pub mod metrics;
pub mod resolver;
pub mod visitors;
