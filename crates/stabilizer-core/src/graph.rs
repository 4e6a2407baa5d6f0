//! Transitive runtime requirements of a package.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::Result;
use crate::resolver::{PackageResolver, ResolvedPackage};

/// Package name → every range it is required at somewhere in the closure.
pub type Requirements = BTreeMap<String, BTreeSet<String>>;

/// Walks `dependencies` + `peerDependencies` breadth-first.
///
/// Each dependency is resolved from the directory of the package that
/// requires it, so nested installs are found. A `name@range` pair is only
/// expanded once per walk, which bounds the walk and tolerates cycles.
pub struct DependencyGraphWalker<'a> {
    resolver: &'a PackageResolver,
}

impl<'a> DependencyGraphWalker<'a> {
    #[must_use]
    pub fn new(resolver: &'a PackageResolver) -> Self {
        Self { resolver }
    }

    /// Collect the requirement closure of `name` resolved from `search_dir`.
    ///
    /// # Errors
    /// Returns `Error::PackageNotFound` if the root package itself cannot be
    /// resolved. Missing transitive packages are leaves.
    pub fn walk(&self, name: &str, search_dir: &Path) -> Result<Requirements> {
        let root = self.resolver.resolve(name, search_dir)?;
        Ok(self.walk_from(&root))
    }

    /// Collect the requirement closure starting at an already resolved package.
    #[must_use]
    pub fn walk_from(&self, root: &Arc<ResolvedPackage>) -> Requirements {
        let mut requirements = Requirements::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<Arc<ResolvedPackage>> = VecDeque::new();
        queue.push_back(Arc::clone(root));

        while let Some(pkg) = queue.pop_front() {
            for (dep, range) in pkg.manifest.runtime_dependencies() {
                requirements
                    .entry(dep.to_string())
                    .or_default()
                    .insert(range.to_string());

                if !visited.insert(format!("{dep}@{range}")) {
                    continue;
                }

                match self.resolver.try_resolve(dep, &pkg.dir) {
                    Some(child) => {
                        trace!(parent = %pkg.manifest.name, dep, range, "walking");
                        queue.push_back(child);
                    }
                    None => debug!(parent = %pkg.manifest.name, dep, range, "missing dependency left as leaf"),
                }
            }
        }

        requirements
    }
}
