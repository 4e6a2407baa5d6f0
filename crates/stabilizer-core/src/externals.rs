//! Externals alias maps.
//!
//! An externals map sends a package name (or a full subpath specifier) to the
//! specifier emitted code should use instead of inlining the package.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::relocate::{self, up_prefix};
use crate::resolver::PackageManifest;

/// Package name → replacement specifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalsMap(BTreeMap<String, String>);

impl ExternalsMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an alias.
    pub fn insert(&mut self, name: impl Into<String>, alias: impl Into<String>) {
        self.0.insert(name.into(), alias.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Overlay `other` on top of `self`; `other` wins on collisions.
    pub fn overlay(&mut self, other: &ExternalsMap) {
        for (name, alias) in other.iter() {
            self.insert(name, alias);
        }
    }

    /// Copy of the map without `name`.
    #[must_use]
    pub fn without(&self, name: &str) -> Self {
        let mut copy = self.clone();
        copy.remove(name);
        copy
    }

    /// Whether `spec` is the bare (non-relative) target of some alias.
    ///
    /// Such specifiers are already in their final form.
    #[must_use]
    pub fn is_bare_target(&self, spec: &str) -> bool {
        !spec.starts_with('.') && self.0.values().any(|v| v == spec)
    }
}

impl FromIterator<(String, String)> for ExternalsMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ExternalsMap {
    type Item = (&'a String, &'a String);
    type IntoIter = std::collections::btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Consumer runtime dependencies mapped to themselves.
///
/// These stay installed as real dependencies of the consumer.
#[must_use]
pub fn self_externals(consumer: &PackageManifest) -> ExternalsMap {
    consumer
        .runtime_dependencies()
        .map(|(name, _)| (name.to_string(), name.to_string()))
        .collect()
}

/// Aliases pointing at the other packages of the vendoring batch.
///
/// The current package maps to its self-reference `../<name>`.
#[must_use]
pub fn batch_externals<'a>(
    current: &str,
    batch: impl IntoIterator<Item = &'a str>,
) -> ExternalsMap {
    batch
        .into_iter()
        .map(|dep| {
            let alias = if dep == current {
                relocate::self_reference(current)
            } else {
                relocate::sibling_path(current, dep)
            };
            (dep.to_string(), alias)
        })
        .collect()
}

/// Layer the four externals sources for one vendored package.
///
/// Precedence, lowest first: consumer dependencies, global externals, batch
/// siblings, per-dependency overrides.
#[must_use]
pub fn compose<'a>(
    current: &str,
    batch: impl IntoIterator<Item = &'a str>,
    global: &ExternalsMap,
    per_dep: &ExternalsMap,
    consumer: &PackageManifest,
) -> ExternalsMap {
    let mut externals = self_externals(consumer);
    externals.overlay(global);
    externals.overlay(&batch_externals(current, batch));
    externals.overlay(per_dep);
    externals
}

/// Drop aliases of declarations-only dependencies; they have no runtime
/// artifact to point at.
#[must_use]
pub fn remove_dts_only<'a>(
    externals: &ExternalsMap,
    dts_only: impl IntoIterator<Item = &'a str>,
) -> ExternalsMap {
    let mut runtime = externals.clone();
    for name in dts_only {
        runtime.remove(name);
    }
    runtime
}

/// Re-base relative aliases for a compile `levels` directories deeper.
///
/// `./a` → `../a`, `../a` → `../../a` for one level. Bare aliases pass
/// through unchanged.
#[must_use]
pub fn exchange_externals(externals: &ExternalsMap, levels: usize) -> ExternalsMap {
    let prefix = up_prefix(levels);
    externals
        .iter()
        .map(|(name, alias)| {
            let rebased = if let Some(rest) = alias.strip_prefix("./") {
                format!("{prefix}{rest}")
            } else if alias.starts_with("../") {
                format!("{prefix}{alias}")
            } else {
                alias.to_string()
            };
            (name.to_string(), rebased)
        })
        .collect()
}

/// Re-base aliases for a nested compile of dependency `name` into
/// `<outDir>/<name>/index.js`.
#[must_use]
pub fn exchange_for_dependency(externals: &ExternalsMap, name: &str) -> ExternalsMap {
    exchange_externals(externals, relocate::scope_segments(name))
}

/// Re-base aliases for a subpath artifact written to `<outDir>/<spec>.js`.
#[must_use]
pub fn exchange_for_subpath(externals: &ExternalsMap, spec: &str) -> ExternalsMap {
    let levels = spec.split('/').filter(|s| !s.is_empty()).count().saturating_sub(1);
    exchange_externals(externals, levels)
}
