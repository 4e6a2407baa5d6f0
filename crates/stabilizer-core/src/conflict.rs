//! Externals version-conflict resolution.
//!
//! An alias may only stand in for a package when the version behind it
//! satisfies every range the vendored package's closure requires.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::externals::ExternalsMap;
use crate::graph::Requirements;
use crate::relocate::sibling_path;
use crate::resolver::PackageResolver;
use crate::specifier::package_name;
use crate::version::{check_range, RangeCheck};

/// An alias dropped because its target does not satisfy a required range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionConflict {
    pub name: String,
    pub alias: String,
    /// Every range recorded for `name` in the closure.
    pub required_ranges: Vec<String>,
    /// The subset of `required_ranges` the actual version violates.
    pub violated_ranges: Vec<String>,
    pub actual_version: String,
}

/// Externals after conflict pruning.
#[derive(Debug, Clone, Default)]
pub struct ConflictOutcome {
    pub externals: ExternalsMap,
    pub conflicts: Vec<VersionConflict>,
}

/// What an alias value points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasTarget<'a> {
    /// `../<name>` from the package's own output directory.
    SelfReference,
    /// A relative path ending in the vendored package directory.
    Sibling,
    /// The bare name itself; installed as a real dependency.
    PassThrough,
    /// Any other string. `package` is its package-name prefix.
    Override { package: &'a str },
}

/// Classify `alias` as the replacement for `name`.
///
/// `current` is the package being vendored.
#[must_use]
pub fn classify_alias<'a>(name: &str, alias: &'a str, current: &str) -> AliasTarget<'a> {
    if alias == name {
        return AliasTarget::PassThrough;
    }
    if name == current && alias == format!("../{name}") {
        return AliasTarget::SelfReference;
    }
    if alias == sibling_path(current, name)
        || (alias.starts_with('.') && alias.ends_with(&format!("/{name}")))
    {
        return AliasTarget::Sibling;
    }
    AliasTarget::Override {
        package: package_name(alias),
    }
}

/// Prunes aliases whose actual target violates a required range.
pub struct ConflictResolver<'a> {
    resolver: &'a PackageResolver,
    cwd: &'a Path,
    current: &'a str,
}

impl<'a> ConflictResolver<'a> {
    /// `current` is the configured name of the package being vendored;
    /// versions are looked up from `cwd`.
    #[must_use]
    pub fn new(resolver: &'a PackageResolver, cwd: &'a Path, current: &'a str) -> Self {
        Self {
            resolver,
            cwd,
            current,
        }
    }

    /// Version of the package `alias` stands for, if determinable.
    #[must_use]
    pub fn actual_version(&self, name: &str, alias: &str) -> Option<String> {
        match classify_alias(name, alias, self.current) {
            AliasTarget::SelfReference | AliasTarget::Sibling | AliasTarget::PassThrough => {
                self.resolver.version_of(name, self.cwd)
            }
            AliasTarget::Override { package } if !package.starts_with('.') => {
                self.resolver.version_of(package, self.cwd)
            }
            AliasTarget::Override { .. } => None,
        }
    }

    /// Judge every alias that the closure also requires. Names are judged
    /// independently; evaluation order does not matter.
    #[must_use]
    pub fn resolve(&self, requirements: &Requirements, externals: &ExternalsMap) -> ConflictOutcome {
        let mut pruned = externals.clone();
        let mut conflicts = Vec::new();

        for (name, alias) in externals.iter() {
            let Some(ranges) = requirements.get(name) else {
                continue;
            };
            let Some(actual) = self.actual_version(name, alias) else {
                debug!(name, alias, "version behind alias undeterminable, keeping");
                continue;
            };

            let violated: Vec<String> = ranges
                .iter()
                .filter(|range| check_range(&actual, range) == RangeCheck::Violated)
                .cloned()
                .collect();
            if violated.is_empty() {
                continue;
            }

            warn!(
                name,
                alias,
                actual = %actual,
                violated = ?violated,
                "external version conflict, alias dropped"
            );
            pruned.remove(name);
            conflicts.push(VersionConflict {
                name: name.to_string(),
                alias: alias.to_string(),
                required_ranges: ranges.iter().cloned().collect(),
                violated_ranges: violated,
                actual_version: actual,
            });
        }

        ConflictOutcome {
            externals: pruned,
            conflicts,
        }
    }
}
