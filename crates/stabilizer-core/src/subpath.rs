//! Subpath import detection.
//!
//! A vendored file that imports `lodash/throttle` cannot be served by an
//! alias for `lodash` alone when `lodash` is vendored as a single bundle, so
//! such specifiers are compiled a second time under their own name.

use std::collections::BTreeSet;

use tracing::debug;

use crate::specifier::{is_subpath, package_name};
use crate::syntax::ParserBackend;

/// Collects subpath specifiers of aliased packages from emitted code.
pub struct SubpathDetector<'a> {
    backend: &'a dyn ParserBackend,
}

impl<'a> SubpathDetector<'a> {
    #[must_use]
    pub fn new(backend: &'a dyn ParserBackend) -> Self {
        Self { backend }
    }

    /// Subpath specifiers in `files` whose package-name prefix is in
    /// `aliased`, deduplicated by full text.
    ///
    /// Files the back end cannot parse contribute nothing.
    pub fn detect<'s>(
        &self,
        files: impl IntoIterator<Item = &'s str>,
        aliased: &BTreeSet<String>,
    ) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        for source in files {
            let module = match self.backend.parse(source) {
                Ok(module) => module,
                Err(e) => {
                    debug!(backend = self.backend.name(), error = %e, "skipping unparsable file");
                    continue;
                }
            };
            for literal in module.specifiers() {
                let spec = literal.value.as_str();
                if is_subpath(spec) && aliased.contains(package_name(spec)) {
                    found.insert(spec.to_string());
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::LexerBackend;

    fn aliased(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    fn detect(files: &[&str], names: &[&str]) -> Vec<String> {
        SubpathDetector::new(&LexerBackend)
            .detect(files.iter().copied(), &aliased(names))
            .into_iter()
            .collect()
    }

    #[test]
    fn test_require_subpath_of_aliased_package() {
        let found = detect(&["const throttle = require('lodash/throttle');"], &["lodash"]);
        assert_eq!(found, vec!["lodash/throttle"]);
    }

    #[test]
    fn test_package_json_is_not_a_subpath() {
        let found = detect(
            &[r#"const pkg = require("lodash/package.json"); require("lodash");"#],
            &["lodash"],
        );
        assert!(found.is_empty());
    }

    #[test]
    fn test_unaliased_packages_ignored() {
        let found = detect(&[r#"require("chalk/source/index.js")"#], &["lodash"]);
        assert!(found.is_empty());
    }

    #[test]
    fn test_other_objects_require_ignored() {
        let found = detect(
            &[r#"module.require("lodash/map"); obj.require("lodash/each");"#],
            &["lodash"],
        );
        assert!(found.is_empty());
    }

    #[test]
    fn test_require_member_counts() {
        let found = detect(&[r#"require.resolve("lodash/fp")"#], &["lodash"]);
        assert_eq!(found, vec!["lodash/fp"]);
    }

    #[test]
    fn test_import_and_reexport_forms() {
        let found = detect(
            &[
                r#"import debounce from "lodash/debounce";"#,
                r#"export { default as merge } from "@scope/util/merge";"#,
                r#"export default "lodash/not-a-reference";"#,
            ],
            &["lodash", "@scope/util"],
        );
        assert_eq!(found, vec!["@scope/util/merge", "lodash/debounce"]);
    }

    #[test]
    fn test_deduplicated_across_files() {
        let found = detect(
            &["require('lodash/throttle')", "require(\"lodash/throttle\")"],
            &["lodash"],
        );
        assert_eq!(found, vec!["lodash/throttle"]);
    }

    #[test]
    fn test_strings_in_comments_ignored() {
        let found = detect(&["// require('lodash/throttle')"], &["lodash"]);
        assert!(found.is_empty());
    }
}
