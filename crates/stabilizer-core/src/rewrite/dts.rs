use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;

use regex_lite::{Captures, Regex};

use crate::dts::DtsLocate;
use crate::error::Result;
use crate::externals::ExternalsMap;
use crate::relocate::join_alias;
use crate::specifier::{classify, ReferenceKind};

use super::{ImportReference, Rewritten, SpecifierRewriter};

/// Rewrites specifiers in declaration files by statement shape.
///
/// Recognised shapes:
/// - `import … from "x"`, with a `{ … }` clause spread over several lines
/// - `import("x")`
/// - `import X = require("x")`
/// - `export … from "x"`, likewise
/// - `/// <reference path="x" />` and `/// <reference types="x" />`
///
/// Matching is textual, so a shape inside a comment is rewritten too. Such
/// matches are reported with `in_comment` set and never followed.
///
/// Unaliased packages are expected to be copied under the package output
/// directory, so `x` becomes `<rel_base>x` plus the subpath or the package's
/// declaration entry.
pub struct DtsRewriter<'a> {
    locator: &'a dyn DtsLocate,
    /// Directory unaliased packages are looked up from.
    search_dir: &'a Path,
}

#[derive(Clone, Copy)]
enum Shape {
    /// `<prefix><q>spec<q>`, the prefix ending in `from` plus its spacing
    Plain,
    /// `<prefix>(<q>spec<q>)`
    Call,
    /// `<prefix><q>spec<q> />`
    TripleSlash,
}

struct Pattern {
    regex: Regex,
    shape: Shape,
}

fn patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (
                r#"(?P<prefix>import\s(?:[^;'"{\n]|\{[^;'"}]*\})*?\bfrom\s*)(?P<q>['"])(?P<name>[^'"]+)['"]"#,
                Shape::Plain,
            ),
            (r#"(?P<prefix>import)\((?P<q>['"])(?P<name>[^'"]+)['"]\)"#, Shape::Call),
            (
                r#"(?P<prefix>import[^=]+?=.+?require)\((?P<q>['"])(?P<name>[^'"]+)['"]\)"#,
                Shape::Call,
            ),
            (
                r#"(?P<prefix>export\s(?:[^;'"{\n]|\{[^;'"}]*\})*?\bfrom\s*)(?P<q>['"])(?P<name>[^'"]+)['"]"#,
                Shape::Plain,
            ),
            (
                r#"(?P<prefix>/// +<reference +(?:path|types)=)(?P<q>['"])(?P<name>[^'"]+)['"] +/>"#,
                Shape::TripleSlash,
            ),
        ]
        .into_iter()
        .filter_map(|(src, shape)| Regex::new(src).ok().map(|regex| Pattern { regex, shape }))
        .collect()
    })
}

impl<'a> DtsRewriter<'a> {
    #[must_use]
    pub fn new(locator: &'a dyn DtsLocate, search_dir: &'a Path) -> Self {
        Self {
            locator,
            search_dir,
        }
    }

    fn target(&self, spec: &str, kind: &ReferenceKind, rel_base: &str) -> String {
        match kind {
            ReferenceKind::Builtin | ReferenceKind::LocalRelative => spec.to_string(),
            ReferenceKind::ExternalAliased { alias, subpath, .. } => {
                join_alias(rel_base, alias, subpath)
            }
            ReferenceKind::ExternalUnaliased { name, subpath } => {
                if !subpath.is_empty() {
                    return format!("{rel_base}{name}{subpath}");
                }
                match self.types_entry(name) {
                    Some(entry) => format!("{rel_base}{name}/{entry}"),
                    None => format!("{rel_base}{name}"),
                }
            }
        }
    }

    /// Declaration entry of `name` without extension, unless it is the
    /// default `index`.
    fn types_entry(&self, name: &str) -> Option<String> {
        let info = self.locator.locate(name, self.search_dir)?;
        let types = info.types.strip_prefix("./").unwrap_or(&info.types);
        let types = types.strip_suffix(".d.ts").unwrap_or(types);
        (types != "index").then(|| types.to_string())
    }
}

impl SpecifierRewriter for DtsRewriter<'_> {
    fn rewrite(&self, source: &str, externals: &ExternalsMap, rel_base: &str) -> Result<Rewritten> {
        let mut code = source.to_string();
        let mut references = Vec::new();

        for pattern in patterns() {
            let comments = comment_ranges(&code);
            code = pattern
                .regex
                .replace_all(&code, |caps: &Captures<'_>| {
                    let prefix = &caps["prefix"];
                    let quote = &caps["q"];
                    let spec = &caps["name"];
                    let start = caps.get(0).map_or(0, |m| m.start());

                    let kind = classify_final(spec, externals);
                    let target = self.target(spec, &kind, rel_base);
                    references.push(ImportReference {
                        specifier: spec.to_string(),
                        kind,
                        in_comment: !matches!(pattern.shape, Shape::TripleSlash)
                            && comments.iter().any(|r| r.contains(&start)),
                    });

                    match pattern.shape {
                        Shape::Plain => format!("{prefix}{quote}{target}{quote}"),
                        Shape::Call => format!("{prefix}({quote}{target}{quote})"),
                        Shape::TripleSlash => format!("{prefix}{quote}{target}{quote} />"),
                    }
                })
                .into_owned();
        }

        Ok(Rewritten { code, references })
    }
}

/// Classify `spec`, treating an earlier rewrite's bare alias value as the
/// aliased reference it already is.
fn classify_final(spec: &str, externals: &ExternalsMap) -> ReferenceKind {
    let kind = classify(spec, externals);
    if !matches!(kind, ReferenceKind::ExternalUnaliased { .. }) || !externals.is_bare_target(spec) {
        return kind;
    }
    match externals.iter().find(|(_, alias)| *alias == spec) {
        Some((key, alias)) => ReferenceKind::ExternalAliased {
            key: key.to_string(),
            alias: alias.to_string(),
            subpath: String::new(),
        },
        None => kind,
    }
}

/// Byte ranges of `//` and `/* */` comments, skipping string contents.
fn comment_ranges(src: &str) -> Vec<Range<usize>> {
    let bytes = src.as_bytes();
    let mut ranges = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote && bytes[i] != b'\n' {
                    i += if bytes[i] == b'\\' { 2 } else { 1 };
                }
                i += 1;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let start = i;
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                ranges.push(start..i);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let start = i;
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
                ranges.push(start..i);
            }
            _ => i += 1,
        }
    }
    ranges
}
