//! Declaration files: locating a package's `.d.ts` entry and copying the
//! declaration graph reachable from it into the output tree.

mod copy;
mod locate;

pub use copy::{resolve_dts, DeclarationCopier, DtsCopyReport};
pub use locate::{entry_sibling, manifest_types, types_package_name, NodeDtsLocator};

use std::path::{Path, PathBuf};

/// A located declaration entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtsInfo {
    /// Absolute path of the entry declaration file.
    pub full_path: PathBuf,
    /// Root directory of the package that owns it.
    pub pkg_dir: PathBuf,
    /// Entry path relative to `pkg_dir`, as a manifest `types` value.
    pub types: String,
}

/// Declaration-file discovery for a package.
pub trait DtsLocate: Send + Sync {
    /// Locate the declaration entry of `name` resolved from `cwd`.
    fn locate(&self, name: &str, cwd: &Path) -> Option<DtsInfo>;
}
