//! Package walk producing the canonical module-name -> file-path map.

use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use log::debug;
use thiserror::Error;
use walkdir::WalkDir;

use crate::config::Config;

/// Discovery failures the caller must be able to tell apart.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Root missing, not a directory, or a single source file with no
    /// internal structure to analyze.
    #[error("{0} is not a multi-file package")]
    NotAPackage(PathBuf),
    /// A bare package name that matched nothing on the module search path.
    #[error("package {0} not found on the module search path")]
    PackageNotFound(String),
    /// The root is a directory but contains no Python source at all.
    #[error("no modules discovered under {0}")]
    NoModules(PathBuf),
    /// Python source exists but every file sits in an excluded directory.
    #[error("no analyzable modules under {0} after filtering")]
    NoAnalyzableModules(PathBuf),
}

/// Resolve a package argument to an analyzable root directory.
///
/// An existing directory passes through unchanged. A bare name (no path
/// separators) is looked up the way the interpreter finds an installed
/// package: PYTHONPATH entries in order, then the active virtualenv's
/// site-packages, probing each for `<name>/__init__.py`.
pub fn locate_package_root(input: &Path) -> Result<PathBuf, DiscoveryError> {
    locate_package_root_with_overrides(input, None, None)
}

/// Variant of [`locate_package_root`] with optional PYTHONPATH and
/// VIRTUAL_ENV overrides for testing; `None` falls back to the environment.
pub fn locate_package_root_with_overrides(
    input: &Path,
    pythonpath_override: Option<&str>,
    virtualenv_override: Option<&str>,
) -> Result<PathBuf, DiscoveryError> {
    if input.is_dir() {
        return Ok(input.to_path_buf());
    }
    let Some(name) = bare_package_name(input) else {
        return Err(DiscoveryError::NotAPackage(input.to_path_buf()));
    };

    let pythonpath = pythonpath_override
        .map(str::to_owned)
        .or_else(|| std::env::var("PYTHONPATH").ok());
    let virtualenv = virtualenv_override
        .map(str::to_owned)
        .or_else(|| std::env::var("VIRTUAL_ENV").ok());
    let search_dirs = search_directories(pythonpath.as_deref(), virtualenv.as_deref());

    for dir in &search_dirs {
        let candidate = dir.join(name);
        if candidate.join("__init__.py").is_file() {
            debug!("located installed package {name} at {}", candidate.display());
            return Ok(candidate);
        }
    }
    Err(DiscoveryError::PackageNotFound(name.to_string()))
}

/// A plain importable name, with no path separators or directory dots.
fn bare_package_name(input: &Path) -> Option<&str> {
    let name = input.to_str()?;
    let plain =
        !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\']);
    plain.then_some(name)
}

/// Module search path in interpreter order: PYTHONPATH entries, then the
/// virtualenv's site-packages directories. Missing entries are dropped.
fn search_directories(pythonpath: Option<&str>, virtualenv: Option<&str>) -> Vec<PathBuf> {
    let mut dirs: IndexSet<PathBuf> = IndexSet::new();

    if let Some(pythonpath) = pythonpath {
        let separator = if cfg!(windows) { ';' } else { ':' };
        for entry in pythonpath.split(separator).filter(|e| !e.is_empty()) {
            let path = PathBuf::from(entry);
            if path.is_dir() {
                dirs.insert(path);
            }
        }
    }

    if let Some(venv) = virtualenv {
        for site in site_packages_directories(Path::new(venv)) {
            dirs.insert(site);
        }
    }

    dirs.into_iter().collect()
}

/// `lib/python*/site-packages` for Unix venv layouts, `Lib/site-packages`
/// for Windows ones.
fn site_packages_directories(venv: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();

    let lib = venv.join("lib");
    if let Ok(entries) = std::fs::read_dir(&lib) {
        for entry in entries.flatten() {
            let site = entry.path().join("site-packages");
            if site.is_dir() {
                found.push(site);
            }
        }
    }

    let windows_site = venv.join("Lib").join("site-packages");
    if windows_site.is_dir() {
        found.push(windows_site);
    }

    found
}

/// Walk a package root and map canonical dotted module names to file paths.
///
/// `pkg/__init__.py` collapses to `pkg`'s directory name; the root's own
/// `__init__.py` is discovered under the package directory's name. Unreadable
/// directories are skipped, never fatal. The result is sorted by module name.
pub fn discover_modules(
    root: &Path,
    config: &Config,
) -> Result<IndexMap<String, PathBuf>, DiscoveryError> {
    if !root.is_dir() {
        return Err(DiscoveryError::NotAPackage(root.to_path_buf()));
    }

    let mut total_sources = 0usize;
    let mut modules: Vec<(String, PathBuf)> = Vec::new();

    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "py") {
            continue;
        }
        total_sources += 1;

        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        if is_excluded(relative, config) {
            continue;
        }
        if let Some(name) = module_name(root, relative) {
            debug!("discovered module {name} at {}", path.display());
            modules.push((name, path.to_path_buf()));
        }
    }

    if total_sources == 0 {
        return Err(DiscoveryError::NoModules(root.to_path_buf()));
    }
    if modules.is_empty() {
        return Err(DiscoveryError::NoAnalyzableModules(root.to_path_buf()));
    }

    modules.sort_by(|a, b| a.0.cmp(&b.0));
    let mut map: IndexMap<String, PathBuf> = IndexMap::with_capacity(modules.len());
    for (name, path) in modules {
        match map.entry(name) {
            indexmap::map::Entry::Vacant(entry) => {
                entry.insert(path);
            }
            indexmap::map::Entry::Occupied(mut entry) => {
                // A package initializer shadows a sibling foo.py with the
                // same dotted name.
                if path.file_name().is_some_and(|f| f == "__init__.py") {
                    entry.insert(path);
                }
            }
        }
    }
    Ok(map)
}

fn is_excluded(relative: &Path, config: &Config) -> bool {
    relative.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| config.exclude_dirs.contains(name))
    })
}

/// Compute the canonical dotted name for a source file relative to the root.
fn module_name(root: &Path, relative: &Path) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    for component in relative.components() {
        parts.push(component.as_os_str().to_str()?.to_string());
    }
    let file = parts.pop()?;

    if file == "__init__.py" {
        if parts.is_empty() {
            // Root initializer: use the package directory's own name.
            return root.file_name().and_then(|n| n.to_str()).map(String::from);
        }
        return Some(parts.join("."));
    }

    let stem = file.strip_suffix(".py")?;
    parts.push(stem.to_string());
    Some(parts.join("."))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(path, "x = 1\n").expect("write file");
    }

    #[test]
    fn dotted_names_follow_directory_structure() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("mypkg");
        touch(&root.join("__init__.py"));
        touch(&root.join("core.py"));
        touch(&root.join("sub/__init__.py"));
        touch(&root.join("sub/worker.py"));

        let modules = discover_modules(&root, &Config::default()).expect("discovery");
        let names: Vec<&str> = modules.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["core", "mypkg", "sub", "sub.worker"]);
        assert_eq!(modules["sub"], root.join("sub/__init__.py"));
    }

    #[test]
    fn excluded_directories_are_pruned() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("pkg");
        touch(&root.join("a.py"));
        touch(&root.join("tests/test_a.py"));
        touch(&root.join("__pycache__/a.cpython-311.py"));

        let modules = discover_modules(&root, &Config::default()).expect("discovery");
        assert_eq!(modules.len(), 1);
        assert!(modules.contains_key("a"));
    }

    #[test]
    fn missing_root_is_not_a_package() {
        let tmp = TempDir::new().expect("tempdir");
        let err = discover_modules(&tmp.path().join("nope"), &Config::default()).unwrap_err();
        assert!(matches!(err, DiscoveryError::NotAPackage(_)));
    }

    #[test]
    fn file_root_is_not_a_package() {
        let tmp = TempDir::new().expect("tempdir");
        let file = tmp.path().join("single.py");
        touch(&file);
        let err = discover_modules(&file, &Config::default()).unwrap_err();
        assert!(matches!(err, DiscoveryError::NotAPackage(_)));
    }

    #[test]
    fn empty_directory_reports_no_modules() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("empty");
        fs::create_dir_all(&root).expect("mkdir");
        let err = discover_modules(&root, &Config::default()).unwrap_err();
        assert!(matches!(err, DiscoveryError::NoModules(_)));
    }

    #[test]
    fn existing_directory_passes_through_the_locator() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("pkg");
        touch(&root.join("a.py"));
        let located = locate_package_root(&root).expect("locate");
        assert_eq!(located, root);
    }

    #[test]
    fn named_package_is_found_via_pythonpath() {
        let tmp = TempDir::new().expect("tempdir");
        let site = tmp.path().join("src");
        touch(&site.join("mypkg/__init__.py"));
        touch(&site.join("mypkg/core.py"));

        let pythonpath = site.to_str().expect("utf-8 path");
        let located = locate_package_root_with_overrides(
            Path::new("mypkg"),
            Some(pythonpath),
            None,
        )
        .expect("locate by name");
        assert_eq!(located, site.join("mypkg"));

        // The located root feeds straight into discovery.
        let modules = discover_modules(&located, &Config::default()).expect("discovery");
        assert!(modules.contains_key("mypkg"));
        assert!(modules.contains_key("core"));
    }

    #[test]
    fn named_package_is_found_in_virtualenv_site_packages() {
        let tmp = TempDir::new().expect("tempdir");
        let venv = tmp.path().join("venv");
        let site = venv.join("lib/python3.11/site-packages");
        touch(&site.join("installed/__init__.py"));

        let located = locate_package_root_with_overrides(
            Path::new("installed"),
            None,
            Some(venv.to_str().expect("utf-8 path")),
        )
        .expect("locate in venv");
        assert_eq!(located, site.join("installed"));
    }

    #[test]
    fn earlier_pythonpath_entries_win() {
        let tmp = TempDir::new().expect("tempdir");
        let first = tmp.path().join("first");
        let second = tmp.path().join("second");
        touch(&first.join("dup/__init__.py"));
        touch(&second.join("dup/__init__.py"));

        let joined = format!(
            "{}:{}",
            first.to_str().expect("utf-8 path"),
            second.to_str().expect("utf-8 path")
        );
        let located =
            locate_package_root_with_overrides(Path::new("dup"), Some(&joined), None)
                .expect("locate");
        assert_eq!(located, first.join("dup"));
    }

    #[test]
    fn unknown_name_is_package_not_found() {
        let tmp = TempDir::new().expect("tempdir");
        let empty = tmp.path().to_str().expect("utf-8 path");
        let err = locate_package_root_with_overrides(
            Path::new("no_such_pkg"),
            Some(empty),
            Some(empty),
        )
        .unwrap_err();
        assert!(matches!(err, DiscoveryError::PackageNotFound(name) if name == "no_such_pkg"));
    }

    #[test]
    fn missing_path_with_separators_is_not_probed_as_a_name() {
        let tmp = TempDir::new().expect("tempdir");
        let err = locate_package_root_with_overrides(
            &tmp.path().join("nope"),
            Some(tmp.path().to_str().expect("utf-8 path")),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DiscoveryError::NotAPackage(_)));
    }

    #[test]
    fn all_sources_filtered_is_distinct_from_empty() {
        let tmp = TempDir::new().expect("tempdir");
        let root = tmp.path().join("pkg");
        touch(&root.join("tests/test_only.py"));
        let err = discover_modules(&root, &Config::default()).unwrap_err();
        assert!(matches!(err, DiscoveryError::NoAnalyzableModules(_)));
    }
}
