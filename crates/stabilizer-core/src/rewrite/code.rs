use crate::error::{Error, Result};
use crate::externals::ExternalsMap;
use crate::relocate::join_alias;
use crate::specifier::{classify, ReferenceKind};
use crate::syntax::ParserBackend;

use super::{splice, ImportReference, Rewritten, SpecifierRewriter};

/// Rewrites aliased specifiers in JavaScript using the parsed module.
///
/// Only `require`, `require.<member>`, `import()`, import declarations and
/// re-exports are rewritten. Unaliased packages are left for Node to
/// resolve from the consumer's dependencies.
pub struct CodeRewriter<'a> {
    backend: &'a dyn ParserBackend,
}

impl<'a> CodeRewriter<'a> {
    #[must_use]
    pub fn new(backend: &'a dyn ParserBackend) -> Self {
        Self { backend }
    }
}

impl SpecifierRewriter for CodeRewriter<'_> {
    fn rewrite(&self, source: &str, externals: &ExternalsMap, rel_base: &str) -> Result<Rewritten> {
        let module = self
            .backend
            .parse(source)
            .map_err(|e| Error::other(format!("{} parser: {e}", self.backend.name())))?;

        let mut edits = Vec::new();
        let mut references = Vec::new();
        for literal in module.specifiers() {
            let kind = classify(&literal.value, externals);
            if let ReferenceKind::ExternalAliased { alias, subpath, .. } = &kind {
                let target = join_alias(rel_base, alias, subpath);
                if target != literal.value {
                    edits.push((literal.span.start, literal.span.end, target));
                }
            }
            references.push(ImportReference {
                specifier: literal.value.clone(),
                kind,
                in_comment: false,
            });
        }

        edits.sort_by_key(|(start, _, _)| *start);
        Ok(Rewritten {
            code: splice(source, &edits),
            references,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::LexerBackend;

    fn externals() -> ExternalsMap {
        let mut ext = ExternalsMap::new();
        ext.insert("left-pad", "../left-pad");
        ext.insert("chalk", "chalk");
        ext.insert("lodash", "../lodash");
        ext.insert("lodash/throttle", "./lodash/throttle");
        ext.insert("chokidar", "@my/kit/compiled/chokidar");
        ext
    }

    fn rewrite(src: &str, rel_base: &str) -> String {
        CodeRewriter::new(&LexerBackend)
            .rewrite(src, &externals(), rel_base)
            .unwrap()
            .code
    }

    #[test]
    fn test_aliases_applied() {
        let src = r#"const pad = require("left-pad");
const chalk = require('chalk');
const t = require('lodash/throttle');
const d = require('lodash/debounce');
import watch from "chokidar";
const fs = require("fs");
const local = require("./util");
const other = require("semver");"#;
        let out = rewrite(src, "./");
        assert!(out.contains(r#"require("../left-pad")"#));
        assert!(out.contains("require('chalk')"));
        assert!(out.contains("require('./lodash/throttle')"));
        assert!(out.contains("require('../lodash/debounce')"));
        assert!(out.contains(r#"from "@my/kit/compiled/chokidar""#));
        assert!(out.contains(r#"require("fs")"#));
        assert!(out.contains(r#"require("./util")"#));
        assert!(out.contains(r#"require("semver")"#));
    }

    #[test]
    fn test_nested_file_rebases_relative_aliases() {
        let out = rewrite(r#"module.exports = require("left-pad");"#, "../../");
        assert_eq!(out, r#"module.exports = require("../../../left-pad");"#);
    }

    #[test]
    fn test_non_references_untouched() {
        let src = r#"obj.require("left-pad"); const s = "left-pad"; // require("left-pad")"#;
        assert_eq!(rewrite(src, "./"), src);
    }

    #[test]
    fn test_idempotent() {
        let src = r#"require("left-pad"); require("lodash/throttle"); import("chokidar");"#;
        let once = rewrite(src, "./");
        assert_eq!(rewrite(&once, "./"), once);
    }

    #[test]
    fn test_references_recorded() {
        let result = CodeRewriter::new(&LexerBackend)
            .rewrite(r#"require("./a"); require("path"); require("x/y")"#, &externals(), "./")
            .unwrap();
        let kinds: Vec<_> = result.references.iter().map(|r| &r.kind).collect();
        assert_eq!(kinds[0], &ReferenceKind::LocalRelative);
        assert_eq!(kinds[1], &ReferenceKind::Builtin);
        assert_eq!(
            kinds[2],
            &ReferenceKind::ExternalUnaliased {
                name: "x".into(),
                subpath: "/y".into()
            }
        );
    }
}
