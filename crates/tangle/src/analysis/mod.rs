//! Module-level analysis pipeline and the engines built on top of it.

pub mod advisor;
pub mod lazy_imports;
pub mod pipeline;

pub use advisor::{RefactorCandidate, RefactorReport, rank_extraction_candidates};
pub use lazy_imports::{LazyImportReport, LazyOccurrenceResult, LazyVerdict, evaluate_lazy_imports};
pub use pipeline::{AnalysisError, LazyImportRecord, ModuleInfo, PackageAnalysis, analyze_package};
