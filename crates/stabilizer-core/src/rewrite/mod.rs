//! Specifier rewriting for emitted files.
//!
//! Two strategies share [`SpecifierRewriter`]: [`CodeRewriter`] works on the
//! parsed module and only touches real dependency references, while
//! [`DtsRewriter`] matches declaration-file statement shapes textually.
//! Both leave their own output unchanged when run again.

mod code;
mod dts;

pub use code::CodeRewriter;
pub use dts::DtsRewriter;

use crate::error::Result;
use crate::externals::ExternalsMap;
use crate::specifier::ReferenceKind;

/// One specifier occurrence found while rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReference {
    /// The specifier as written in the input.
    pub specifier: String,
    pub kind: ReferenceKind,
    /// Matched inside a comment. Only the pattern strategy can produce these;
    /// they are rewritten but never followed.
    pub in_comment: bool,
}

impl ImportReference {
    /// Whether declaration copying should follow this reference.
    #[must_use]
    pub fn is_followed(&self) -> bool {
        !self.in_comment
            && matches!(
                self.kind,
                ReferenceKind::LocalRelative | ReferenceKind::ExternalUnaliased { .. }
            )
    }
}

/// Rewritten file contents plus every reference seen.
///
/// `CodeRewriter` lists references in input order; `DtsRewriter` groups them
/// by statement shape, each group in input order.
#[derive(Debug, Clone, Default)]
pub struct Rewritten {
    pub code: String,
    pub references: Vec<ImportReference>,
}

/// Rewrites module specifiers in one file.
pub trait SpecifierRewriter: Send + Sync {
    /// Rewrite `source`. `rel_base` leads from the file's directory back to
    /// the package output directory that relative aliases are based on.
    ///
    /// # Errors
    /// Returns an error when the input cannot be analysed.
    fn rewrite(&self, source: &str, externals: &ExternalsMap, rel_base: &str) -> Result<Rewritten>;
}

/// Replace byte ranges of `source`. `edits` must be sorted and disjoint.
fn splice(source: &str, edits: &[(usize, usize, String)]) -> String {
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for (start, end, replacement) in edits {
        out.push_str(&source[cursor..*start]);
        out.push_str(replacement);
        cursor = *end;
    }
    out.push_str(&source[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splice() {
        let out = splice(
            "require('a'); require('b');",
            &[(9, 10, "../a".to_string()), (23, 24, "bb".to_string())],
        );
        assert_eq!(out, "require('../a'); require('bb');");
    }

    #[test]
    fn test_followed_references() {
        let local = ImportReference {
            specifier: "./x".into(),
            kind: ReferenceKind::LocalRelative,
            in_comment: false,
        };
        assert!(local.is_followed());
        assert!(!ImportReference {
            in_comment: true,
            ..local.clone()
        }
        .is_followed());
        assert!(!ImportReference {
            kind: ReferenceKind::Builtin,
            ..local
        }
        .is_followed());
    }
}
