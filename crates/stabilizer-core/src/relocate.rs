//! Relative path arithmetic for the vendored output tree.
//!
//! Every vendored package lives at `<out>/<name>`, so a scoped name sits one
//! directory deeper than an unscoped one. All paths produced here use `/`
//! separators regardless of platform since they end up inside specifiers.

use std::path::{Component, Path, PathBuf};

use crate::specifier::is_scoped;

/// Number of directory segments a package name occupies.
#[must_use]
pub fn scope_segments(name: &str) -> usize {
    if is_scoped(name) {
        2
    } else {
        1
    }
}

/// `levels` repetitions of `../`.
#[must_use]
pub fn up_prefix(levels: usize) -> String {
    "../".repeat(levels)
}

/// Prefix leading from a package's output directory back to the output root.
#[must_use]
pub fn output_root_prefix(name: &str) -> String {
    up_prefix(scope_segments(name))
}

/// Relative path between two `/`-separated locations under a common root.
///
/// `relative_path("demo", "left-pad")` is `../left-pad`,
/// `relative_path("@a/b", "c")` is `../../c`.
#[must_use]
pub fn relative_path(from: &str, to: &str) -> String {
    let from: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = std::iter::repeat("..").take(from.len() - common).collect();
    parts.extend(&to[common..]);
    parts.join("/")
}

/// Alias of one vendored package as seen from another one's output directory.
#[must_use]
pub fn sibling_path(from_name: &str, to_name: &str) -> String {
    relative_path(from_name, to_name)
}

/// Self-reference alias of a vendored package.
///
/// Always a single `../`, also for scoped names: from `<out>/@s/demo` the
/// alias `../@s/demo` lands on `<out>/@s/@s/demo`, not on the package itself.
/// Use [`output_root_prefix`] when the package directory is meant.
#[must_use]
pub fn self_reference(name: &str) -> String {
    format!("../{name}")
}

/// Filesystem relative path from `from` to `to`. Both must be absolute or
/// both relative to the same base.
#[must_use]
pub fn diff_paths(to: &Path, from: &Path) -> PathBuf {
    let to: Vec<Component<'_>> = to.components().collect();
    let from: Vec<Component<'_>> = from.components().collect();

    let common = to
        .iter()
        .zip(from.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in common..from.len() {
        result.push("..");
    }
    for component in &to[common..] {
        result.push(component.as_os_str());
    }
    result
}

/// Prefix from a file's directory back to `root`: `./` when the file sits in
/// `root` itself, otherwise one `../` per level.
#[must_use]
pub fn relative_prefix(file_dir: &Path, root: &Path) -> String {
    let rel = diff_paths(root, file_dir);
    let rel = to_slash(&rel);
    if rel.is_empty() {
        "./".to_string()
    } else {
        format!("{rel}/")
    }
}

/// Lossy `/`-separated rendering of a path.
#[must_use]
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Collapse `.` and `x/..` segments in a relative specifier.
///
/// The result always starts with `./` or `../`.
#[must_use]
pub fn normalize_relative(spec: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in spec.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(out.last(), Some(last) if *last != "..") {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }

    let joined = out.join("/");
    if out.first() == Some(&"..") {
        joined
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        format!("./{joined}")
    }
}

/// Combine a file's relative prefix with an alias and the original subpath.
///
/// Relative aliases are rebased onto `rel_base`. Bare aliases are used as is.
#[must_use]
pub fn join_alias(rel_base: &str, alias: &str, subpath: &str) -> String {
    if alias.starts_with('.') {
        let mut joined = normalize_relative(&format!("{rel_base}{alias}"));
        joined.push_str(subpath);
        joined
    } else {
        format!("{alias}{subpath}")
    }
}
