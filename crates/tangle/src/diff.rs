//! Cross-snapshot structural diff: run the module pipeline at two revisions
//! of a repository and compare the metrics.
//!
//! The working tree is a scoped resource: the original revision is looked up
//! first and restored by a drop guard on every exit path, including when one
//! of the per-revision analyses fails.

use std::{
    fmt,
    path::{Path, PathBuf},
    process::Command,
};

use log::warn;
use serde::Serialize;
use thiserror::Error;

use crate::{
    analysis::pipeline::{AnalysisError, analyze_package},
    config::Config,
    metrics::MetricsSnapshot,
};

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("version control operation failed: {0}")]
    Vcs(String),
    #[error("analysis at revision {revision} failed: {source}")]
    RevisionAnalysis {
        revision: String,
        #[source]
        source: AnalysisError,
    },
}

/// Capability interface over the repository's version control tool.
pub trait VersionControlProvider {
    /// Identifier of the currently checked-out revision (branch name when on
    /// a branch, commit id when detached).
    fn current_revision(&self) -> Result<String, DiffError>;

    /// Materialize the working tree at the given revision.
    fn checkout(&self, revision: &str) -> Result<(), DiffError>;
}

/// Git implementation shelling out to the `git` binary.
#[derive(Debug)]
pub struct GitCli {
    repo: PathBuf,
}

impl GitCli {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self { repo: repo.into() }
    }

    fn run(&self, args: &[&str]) -> Result<String, DiffError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo)
            .args(args)
            .output()
            .map_err(|err| DiffError::Vcs(format!("failed to run git: {err}")))?;
        if !output.status.success() {
            return Err(DiffError::Vcs(format!(
                "git {} exited with {}: {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl VersionControlProvider for GitCli {
    fn current_revision(&self) -> Result<String, DiffError> {
        let name = self.run(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        if name == "HEAD" {
            // Detached head: fall back to the commit id.
            return self.run(&["rev-parse", "HEAD"]);
        }
        Ok(name)
    }

    fn checkout(&self, revision: &str) -> Result<(), DiffError> {
        self.run(&["checkout", "--quiet", revision]).map(|_| ())
    }
}

/// Restores the original revision when dropped, even on error paths.
struct RevisionGuard<'a> {
    vcs: &'a dyn VersionControlProvider,
    original: String,
}

impl Drop for RevisionGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.vcs.checkout(&self.original) {
            warn!("failed to restore revision {}: {err}", self.original);
        }
    }
}

/// Per-metric deltas, after minus before.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsDelta {
    pub modules: i64,
    pub edges: i64,
    pub avg_out_degree: f64,
    pub max_out_degree: i64,
    pub cycle_count: i64,
    pub composite: f64,
    pub burden: f64,
    pub total_lines: i64,
}

impl MetricsDelta {
    fn between(before: &MetricsSnapshot, after: &MetricsSnapshot) -> Self {
        Self {
            modules: after.modules as i64 - before.modules as i64,
            edges: after.edges as i64 - before.edges as i64,
            avg_out_degree: after.avg_out_degree - before.avg_out_degree,
            max_out_degree: after.max_out_degree as i64 - before.max_out_degree as i64,
            cycle_count: after.cycle_count as i64 - before.cycle_count as i64,
            composite: after.composite - before.composite,
            burden: after.burden - before.burden,
            total_lines: after.total_lines as i64 - before.total_lines as i64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiffVerdict {
    StructuralImprovement,
    StructuralDegradation,
    Mixed,
    Neutral,
}

impl fmt::Display for DiffVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::StructuralImprovement => "STRUCTURAL IMPROVEMENT",
            Self::StructuralDegradation => "STRUCTURAL DEGRADATION",
            Self::Mixed => "MIXED",
            Self::Neutral => "NEUTRAL",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotDiff {
    pub before_revision: String,
    pub after_revision: String,
    pub before: MetricsSnapshot,
    pub after: MetricsSnapshot,
    pub delta: MetricsDelta,
    pub verdict: DiffVerdict,
}

/// Decision list over the composite and cycle deltas.
fn verdict(delta: &MetricsDelta) -> DiffVerdict {
    if delta.composite == 0.0 && delta.cycle_count == 0 {
        DiffVerdict::Neutral
    } else if delta.composite < 0.0 && delta.cycle_count <= 0 {
        DiffVerdict::StructuralImprovement
    } else if delta.composite >= 0.0 && delta.cycle_count >= 0 {
        DiffVerdict::StructuralDegradation
    } else {
        DiffVerdict::Mixed
    }
}

/// Analyze `package_path` (relative to the repository) at two revisions and
/// diff the resulting snapshots. The working tree is restored to its original
/// revision before this function returns or propagates an error.
pub fn diff_snapshots(
    vcs: &dyn VersionControlProvider,
    repo_root: &Path,
    package_path: &Path,
    before_revision: &str,
    after_revision: &str,
    config: &Config,
) -> Result<SnapshotDiff, DiffError> {
    let original = vcs.current_revision()?;
    let _guard = RevisionGuard { vcs, original };

    let package_root = repo_root.join(package_path);
    let before = snapshot_at(vcs, &package_root, before_revision, config)?;
    let after = snapshot_at(vcs, &package_root, after_revision, config)?;

    let delta = MetricsDelta::between(&before, &after);
    let verdict = verdict(&delta);

    Ok(SnapshotDiff {
        before_revision: before_revision.to_string(),
        after_revision: after_revision.to_string(),
        before,
        after,
        delta,
        verdict,
    })
}

fn snapshot_at(
    vcs: &dyn VersionControlProvider,
    package_root: &Path,
    revision: &str,
    config: &Config,
) -> Result<MetricsSnapshot, DiffError> {
    vcs.checkout(revision)?;
    let analysis =
        analyze_package(package_root, config).map_err(|source| DiffError::RevisionAnalysis {
            revision: revision.to_string(),
            source,
        })?;
    Ok(analysis.snapshot)
}
