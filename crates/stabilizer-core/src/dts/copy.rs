//! Recursive declaration copying.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{DtsInfo, DtsLocate};
use crate::error::Result;
use crate::externals::ExternalsMap;
use crate::relocate::{diff_paths, relative_prefix};
use crate::rewrite::{DtsRewriter, SpecifierRewriter};
use crate::specifier::ReferenceKind;

/// Files written by one declaration copy.
#[derive(Debug, Clone, Default)]
pub struct DtsCopyReport {
    /// Output path of the entry declaration.
    pub entry: PathBuf,
    pub written: Vec<PathBuf>,
}

struct Job {
    file: PathBuf,
    pkg_dir: PathBuf,
    out_dir: PathBuf,
}

/// Copies a declaration entry and everything it references.
///
/// Files keep their package-relative location under the output directory.
/// Unaliased packages referenced from declarations are copied under
/// `<root>/<name>/`. Each file and each package is visited once.
pub struct DeclarationCopier<'a> {
    locator: &'a dyn DtsLocate,
}

impl<'a> DeclarationCopier<'a> {
    #[must_use]
    pub fn new(locator: &'a dyn DtsLocate) -> Self {
        Self { locator }
    }

    /// Copy the graph starting at `entry` into `root`.
    ///
    /// # Errors
    /// Returns an error if a reachable declaration file cannot be read or
    /// an output file cannot be written.
    pub fn copy(&self, entry: &DtsInfo, root: &Path, externals: &ExternalsMap) -> Result<DtsCopyReport> {
        let mut report = DtsCopyReport::default();
        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut packages: HashSet<String> = HashSet::new();
        let mut queue = VecDeque::from([Job {
            file: entry.full_path.clone(),
            pkg_dir: entry.pkg_dir.clone(),
            out_dir: root.to_path_buf(),
        }]);

        while let Some(job) = queue.pop_front() {
            if !visited.insert(job.file.clone()) {
                continue;
            }

            let relative = diff_paths(&job.file, &job.pkg_dir);
            if relative.starts_with("..") {
                debug!(file = %job.file.display(), "declaration outside its package, skipped");
                continue;
            }
            let out_path = job.out_dir.join(&relative);
            let file_dir = job.file.parent().unwrap_or(Path::new("")).to_path_buf();
            let rel_base = relative_prefix(out_path.parent().unwrap_or(root), root);

            let source = stabilizer_util::fs::read_to_string_lossy(&job.file)?;
            let rewritten =
                DtsRewriter::new(self.locator, &file_dir).rewrite(&source, externals, &rel_base)?;
            stabilizer_util::fs::atomic_write(&out_path, rewritten.code.as_bytes())?;
            debug!(from = %job.file.display(), to = %out_path.display(), "copied declaration");

            if report.written.is_empty() {
                report.entry.clone_from(&out_path);
            }
            report.written.push(out_path);

            for reference in rewritten.references.iter().filter(|r| r.is_followed()) {
                match &reference.kind {
                    ReferenceKind::LocalRelative => match resolve_dts(&file_dir, &reference.specifier) {
                        Some(file) => queue.push_back(Job {
                            file,
                            pkg_dir: job.pkg_dir.clone(),
                            out_dir: job.out_dir.clone(),
                        }),
                        None => debug!(
                            specifier = %reference.specifier,
                            from = %job.file.display(),
                            "local declaration unresolved"
                        ),
                    },
                    ReferenceKind::ExternalUnaliased { name, .. } => {
                        if !packages.insert(name.clone()) {
                            continue;
                        }
                        match self.locator.locate(name, &file_dir) {
                            Some(info) => queue.push_back(Job {
                                file: info.full_path,
                                pkg_dir: info.pkg_dir,
                                out_dir: root.join(name),
                            }),
                            None => debug!(name = %name, "no declarations for referenced package"),
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(report)
    }
}

/// Resolve a relative declaration import.
///
/// `./a.js` probes `./a.d.ts`; `./a` probes `./a.d.ts`, `./a` itself and
/// `./a/index.d.ts`.
#[must_use]
pub fn resolve_dts(from_dir: &Path, spec: &str) -> Option<PathBuf> {
    let base = from_dir.join(spec);
    if [".d.ts", ".d.mts", ".d.cts"].iter().any(|ext| spec.ends_with(ext)) {
        return base.is_file().then_some(base);
    }

    let mut candidates = Vec::new();
    for (ext, dts_ext) in [(".js", ".d.ts"), (".mjs", ".d.mts"), (".cjs", ".d.cts")] {
        if let Some(stem) = spec.strip_suffix(ext) {
            candidates.push(from_dir.join(format!("{stem}{dts_ext}")));
        }
    }
    candidates.push(from_dir.join(format!("{spec}.d.ts")));
    candidates.push(base.clone());
    candidates.push(base.join("index.d.ts"));

    candidates.into_iter().find(|c| c.is_file())
}
