//! Package resolution for vendoring.
//!
//! Node-style lookup of packages and modules from a directory, `exports`
//! condition matching, and a cached resolver shared across a run.

mod exports;
mod manifest;
mod node;
mod package;

pub use exports::{resolve_exports, resolve_exports_root, REQUIRE_CONDITIONS, TYPES_CONDITIONS};
pub use manifest::{PackageManifest, TrimmedManifest};
pub use node::{
    find_manifest_above, find_package_manifest, resolve_module, resolve_path, REQUIRE_EXTENSIONS,
};
pub use package::{PackageResolver, ResolvedPackage};
