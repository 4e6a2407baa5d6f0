//! Package resolution with a run-scoped cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::manifest::PackageManifest;
use super::node::{find_manifest_above, find_package_manifest, resolve_module};
use crate::error::{Error, Result};

/// A package manifest together with where it was found.
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    pub manifest: PackageManifest,
    /// Directory containing `package.json`.
    pub dir: PathBuf,
    pub manifest_path: PathBuf,
    /// Runtime entry file, absent for type-only packages.
    pub entry: Option<PathBuf>,
}

type CacheKey = (String, PathBuf);

/// Resolves `(name, searchDir)` to a [`ResolvedPackage`].
///
/// One resolver is shared by every dependency of a run. Entries are a pure
/// function of the filesystem at first resolution and are never invalidated;
/// concurrent misses on the same key may compute twice.
#[derive(Debug, Default)]
pub struct PackageResolver {
    cache: RwLock<HashMap<CacheKey, Arc<ResolvedPackage>>>,
}

impl PackageResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `name` as seen from `search_dir`.
    ///
    /// # Errors
    /// Returns `Error::PackageNotFound` when neither the entry point nor the
    /// manifest can be located, and `Error::ManifestInvalid` when the located
    /// manifest does not parse.
    pub fn resolve(&self, name: &str, search_dir: &Path) -> Result<Arc<ResolvedPackage>> {
        let key = (name.to_string(), search_dir.to_path_buf());
        if let Some(cached) = self.cache.read().unwrap().get(&key) {
            return Ok(Arc::clone(cached));
        }

        let resolved = Arc::new(resolve_uncached(name, search_dir)?);
        debug!(
            name,
            dir = %resolved.dir.display(),
            version = %resolved.manifest.version,
            "resolved package"
        );

        self.cache
            .write()
            .unwrap()
            .entry(key)
            .or_insert_with(|| Arc::clone(&resolved));
        Ok(resolved)
    }

    /// Like [`resolve`](Self::resolve) but treats any failure as absence.
    #[must_use]
    pub fn try_resolve(&self, name: &str, search_dir: &Path) -> Option<Arc<ResolvedPackage>> {
        match self.resolve(name, search_dir) {
            Ok(pkg) => Some(pkg),
            Err(e) => {
                debug!(name, search_dir = %search_dir.display(), error = %e, "package unavailable");
                None
            }
        }
    }

    /// Version of `name` as seen from `search_dir`, if resolvable.
    #[must_use]
    pub fn version_of(&self, name: &str, search_dir: &Path) -> Option<String> {
        self.try_resolve(name, search_dir)
            .map(|pkg| pkg.manifest.version.clone())
            .filter(|v| !v.is_empty())
    }

    /// Number of cached resolutions.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.read().unwrap().len()
    }
}

fn resolve_uncached(name: &str, search_dir: &Path) -> Result<ResolvedPackage> {
    let entry = resolve_module(name, search_dir);

    let manifest_path = entry
        .as_deref()
        .and_then(Path::parent)
        .and_then(find_manifest_above)
        .or_else(|| find_package_manifest(name, search_dir))
        .ok_or_else(|| Error::package_not_found(name, search_dir))?;

    let manifest = PackageManifest::read(&manifest_path)?;
    if manifest.is_decoy() {
        return relocate_decoy(name, search_dir, &manifest_path, entry);
    }

    Ok(ResolvedPackage {
        dir: parent_dir(&manifest_path),
        manifest,
        manifest_path,
        entry,
    })
}

/// Retry from two directories up from a decoy manifest file.
fn relocate_decoy(
    name: &str,
    search_dir: &Path,
    decoy_path: &Path,
    entry: Option<PathBuf>,
) -> Result<ResolvedPackage> {
    debug!(name, decoy = %decoy_path.display(), "skipping private manifest without entry");

    let manifest_path = decoy_path
        .parent()
        .and_then(Path::parent)
        .and_then(find_manifest_above)
        .ok_or_else(|| Error::package_not_found(name, search_dir))?;

    Ok(ResolvedPackage {
        manifest: PackageManifest::read(&manifest_path)?,
        dir: parent_dir(&manifest_path),
        manifest_path,
        entry,
    })
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}
