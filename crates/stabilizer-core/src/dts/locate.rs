//! Declaration entry discovery.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::{DtsInfo, DtsLocate};
use crate::relocate::{diff_paths, to_slash};
use crate::resolver::{
    resolve_exports_root, PackageManifest, PackageResolver, ResolvedPackage, TYPES_CONDITIONS,
};

/// Locates declarations the way a typical package publishes them.
///
/// In order: the manifest `types`/`typings` field, the `types` condition of
/// the root `exports` entry, a `.d.ts` sibling of the runtime entry, a root `index.d.ts`, and finally the DefinitelyTyped
/// `@types/` package.
#[derive(Debug)]
pub struct NodeDtsLocator {
    resolver: Arc<PackageResolver>,
    cache: RwLock<HashMap<(String, PathBuf), Option<DtsInfo>>>,
}

impl NodeDtsLocator {
    #[must_use]
    pub fn new(resolver: Arc<PackageResolver>) -> Self {
        Self {
            resolver,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn locate_uncached(&self, name: &str, cwd: &Path) -> Option<DtsInfo> {
        let Some(pkg) = self.resolver.try_resolve(name, cwd) else {
            return self.types_package(name, cwd);
        };

        if let Some(info) = from_types_field(&pkg).or_else(|| from_exports(&pkg)) {
            return Some(info);
        }

        if let Some(dts) = pkg.entry.as_deref().and_then(entry_sibling) {
            if dts.is_file() {
                let types = to_slash(&diff_paths(&dts, &pkg.dir));
                return Some(DtsInfo {
                    full_path: dts,
                    pkg_dir: pkg.dir.clone(),
                    types,
                });
            }
        }

        let index = pkg.dir.join("index.d.ts");
        if index.is_file() {
            return Some(DtsInfo {
                full_path: index,
                pkg_dir: pkg.dir.clone(),
                types: "index.d.ts".to_string(),
            });
        }

        self.types_package(name, cwd)
    }

    fn types_package(&self, name: &str, cwd: &Path) -> Option<DtsInfo> {
        let types_name = types_package_name(name);
        let Some(pkg) = self.resolver.try_resolve(&types_name, cwd) else {
            debug!(name, types_name, "no declarations package installed");
            return None;
        };
        from_types_field(&pkg).or_else(|| {
            let index = pkg.dir.join("index.d.ts");
            index.is_file().then(|| DtsInfo {
                full_path: index,
                pkg_dir: pkg.dir.clone(),
                types: "index.d.ts".to_string(),
            })
        })
    }
}

impl DtsLocate for NodeDtsLocator {
    fn locate(&self, name: &str, cwd: &Path) -> Option<DtsInfo> {
        let key = (name.to_string(), cwd.to_path_buf());
        if let Some(cached) = self.cache.read().unwrap().get(&key) {
            return cached.clone();
        }

        let info = self.locate_uncached(name, cwd);
        self.cache.write().unwrap().insert(key, info.clone());
        info
    }
}

/// `@types` package for `name`: `@babel/core` → `@types/babel__core`.
#[must_use]
pub fn types_package_name(name: &str) -> String {
    let bare = name.strip_prefix('@').unwrap_or(name);
    format!("@types/{}", bare.replacen('/', "__", 1))
}

/// The manifest's declared types path, with `.d.ts` appended when it has no
/// declaration extension.
#[must_use]
pub fn manifest_types(manifest: &PackageManifest) -> Option<String> {
    let types = manifest.types_field()?;
    if is_declaration(types) {
        Some(types.to_string())
    } else {
        Some(format!("{types}.d.ts"))
    }
}

fn from_types_field(pkg: &ResolvedPackage) -> Option<DtsInfo> {
    let types = manifest_types(&pkg.manifest)?;
    let full_path = pkg.dir.join(&types);
    if !full_path.is_file() {
        debug!(name = %pkg.manifest.name, types, "declared types file missing");
        return None;
    }
    Some(DtsInfo {
        full_path,
        pkg_dir: pkg.dir.clone(),
        types,
    })
}

fn from_exports(pkg: &ResolvedPackage) -> Option<DtsInfo> {
    let target = resolve_exports_root(pkg.manifest.exports.as_ref()?, TYPES_CONDITIONS)?;
    let types = target.strip_prefix("./").unwrap_or(&target);
    if !is_declaration(types) {
        return None;
    }
    let full_path = pkg.dir.join(types);
    full_path.is_file().then(|| DtsInfo {
        full_path,
        pkg_dir: pkg.dir.clone(),
        types: types.to_string(),
    })
}

fn is_declaration(path: &str) -> bool {
    [".d.ts", ".d.mts", ".d.cts"].iter().any(|ext| path.ends_with(ext))
}

/// `x.js` → `x.d.ts`, `x.cjs` → `x.d.cts`, `x.mjs` → `x.d.mts`.
#[must_use]
pub fn entry_sibling(entry: &Path) -> Option<PathBuf> {
    let file = entry.file_name()?.to_str()?;
    let dts = [(".js", ".d.ts"), (".cjs", ".d.cts"), (".mjs", ".d.mts")]
        .iter()
        .find_map(|(ext, dts_ext)| file.strip_suffix(ext).map(|stem| format!("{stem}{dts_ext}")))?;
    Some(entry.with_file_name(dts))
}
