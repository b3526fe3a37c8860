//! Analysis configuration.

use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexSet;
use serde::Deserialize;

/// Directory names pruned during module discovery.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "__pycache__",
    ".git",
    ".hg",
    ".mypy_cache",
    ".pytest_cache",
    ".ruff_cache",
    ".tox",
    ".venv",
    "venv",
    "env",
    ".eggs",
    "build",
    "dist",
    "node_modules",
    "site-packages",
    "tests",
    "test",
    "testing",
    "vendor",
    "_vendor",
    "vendored",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory names skipped by the discovery walk.
    pub exclude_dirs: IndexSet<String>,
    /// How many top cycle participants the refactor advisor simulates.
    pub advisor_candidates: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclude_dirs: DEFAULT_EXCLUDED_DIRS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            advisor_candidates: 5,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_excludes_cover_cache_dirs() {
        let config = Config::default();
        assert!(config.exclude_dirs.contains("__pycache__"));
        assert!(config.exclude_dirs.contains("tests"));
        assert_eq!(config.advisor_candidates, 5);
    }

    #[test]
    fn load_merges_partial_toml_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tangle.toml");
        std::fs::write(&path, "advisor_candidates = 2\n").expect("write config");
        let config = Config::load(&path).expect("load config");
        assert_eq!(config.advisor_candidates, 2);
        assert!(config.exclude_dirs.contains("__pycache__"));
    }
}
