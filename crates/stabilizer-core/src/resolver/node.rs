//! Node-style entry resolution.
//!
//! Approximates `require.resolve` for vendoring: relative and absolute
//! paths, bare specifiers through `node_modules` walk-up, `exports` with
//! CommonJS conditions, then `main`, then `index.*`.

use std::path::{Path, PathBuf};

use super::exports::{resolve_exports, REQUIRE_CONDITIONS};
use super::manifest::PackageManifest;
use crate::specifier::split_specifier;

/// Extensions probed by `require`, in order.
pub const REQUIRE_EXTENSIONS: &[&str] = &[".js", ".json", ".node", ".cjs", ".mjs"];

/// Resolve a specifier from `from_dir` to an entry file.
#[must_use]
pub fn resolve_module(spec: &str, from_dir: &Path) -> Option<PathBuf> {
    if spec.is_empty() {
        return None;
    }
    if spec.starts_with("./") || spec.starts_with("../") || spec == "." || spec == ".." {
        return resolve_path(&from_dir.join(spec));
    }
    if Path::new(spec).is_absolute() {
        return resolve_path(Path::new(spec));
    }
    resolve_bare(spec, from_dir)
}

/// Resolve a bare specifier by walking up `node_modules` directories.
fn resolve_bare(spec: &str, from_dir: &Path) -> Option<PathBuf> {
    let (name, subpath) = split_specifier(spec);

    for dir in from_dir.ancestors() {
        let pkg_dir = dir.join("node_modules").join(name);
        if !pkg_dir.is_dir() {
            continue;
        }

        let resolved = if subpath.is_empty() {
            resolve_package_root(&pkg_dir)
        } else {
            resolve_package_subpath(&pkg_dir, subpath)
        };
        if resolved.is_some() {
            return resolved;
        }
    }

    None
}

fn read_manifest(pkg_dir: &Path) -> Option<PackageManifest> {
    let path = pkg_dir.join("package.json");
    if !path.is_file() {
        return None;
    }
    PackageManifest::read(&path).ok()
}

/// Root entry of a package directory: `exports`, then `main`/`index`.
fn resolve_package_root(pkg_dir: &Path) -> Option<PathBuf> {
    if let Some(exports) = read_manifest(pkg_dir).and_then(|m| m.exports) {
        // A package with exports exposes nothing else
        let target = resolve_exports(&exports, ".", REQUIRE_CONDITIONS)?;
        return resolve_file(&pkg_dir.join(target.trim_start_matches("./")));
    }
    resolve_directory(pkg_dir)
}

/// `subpath` keeps its leading `/`.
fn resolve_package_subpath(pkg_dir: &Path, subpath: &str) -> Option<PathBuf> {
    if let Some(exports) = read_manifest(pkg_dir).and_then(|m| m.exports) {
        let key = format!(".{subpath}");
        if let Some(target) = resolve_exports(&exports, &key, REQUIRE_CONDITIONS) {
            return resolve_file(&pkg_dir.join(target.trim_start_matches("./")));
        }
    }
    resolve_path(&pkg_dir.join(subpath.trim_start_matches('/')))
}

/// Resolve a filesystem path as a file, then as a directory.
#[must_use]
pub fn resolve_path(base: &Path) -> Option<PathBuf> {
    resolve_file(base).or_else(|| resolve_directory(base))
}

/// Exact file, then the path with each extension appended.
fn resolve_file(base: &Path) -> Option<PathBuf> {
    if base.is_file() {
        return Some(canonical(base));
    }

    for ext in REQUIRE_EXTENSIONS {
        let mut with_ext = base.as_os_str().to_owned();
        with_ext.push(ext);
        let with_ext = PathBuf::from(with_ext);
        if with_ext.is_file() {
            return Some(canonical(&with_ext));
        }
    }

    None
}

/// Directory entry: `package.json#main`, then `index.*`.
fn resolve_directory(dir: &Path) -> Option<PathBuf> {
    if !dir.is_dir() {
        return None;
    }

    if let Some(main) = read_manifest(dir).and_then(|m| m.main) {
        let main_path = dir.join(&main);
        if let Some(found) = resolve_file(&main_path).or_else(|| resolve_index(&main_path)) {
            return Some(found);
        }
    }

    resolve_index(dir)
}

fn resolve_index(dir: &Path) -> Option<PathBuf> {
    resolve_file(&dir.join("index"))
}

/// Locate `node_modules/<name>/package.json` walking up from `from_dir`.
#[must_use]
pub fn find_package_manifest(name: &str, from_dir: &Path) -> Option<PathBuf> {
    from_dir
        .ancestors()
        .map(|dir| dir.join("node_modules").join(name).join("package.json"))
        .find(|path| path.is_file())
        .map(|path| canonical(&path))
}

/// Nearest `package.json` at or above `start`, not crossing a
/// `node_modules` directory.
#[must_use]
pub fn find_manifest_above(start: &Path) -> Option<PathBuf> {
    for dir in start.ancestors() {
        if dir.file_name().is_some_and(|n| n == "node_modules") {
            return None;
        }
        let candidate = dir.join("package.json");
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

fn canonical(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
