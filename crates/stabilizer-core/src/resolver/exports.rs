//! Package.json `exports` field evaluation.
//!
//! Covers the shapes vendored packages use in practice:
//! - string shorthand and root condition objects
//! - exact subpath keys (`"./feature"`)
//! - single-`*` pattern keys (`"./lib/*"`)
//! - nested condition objects and fallback arrays
//!
//! Conditions are matched in caller priority order, not object key order.

use serde_json::Value;

/// Conditions used when resolving an entry the way `require()` does.
pub const REQUIRE_CONDITIONS: &[&str] = &["require", "node", "default"];

/// Conditions used when looking for declaration entries.
pub const TYPES_CONDITIONS: &[&str] = &["types", "require", "node", "default"];

// Guards against pathological nesting.
const MAX_CONDITION_DEPTH: usize = 8;

/// Resolve `subpath` (`"."` or `"./x"`) against an `exports` value.
///
/// Returns the target path (starting with `./`) if found.
#[must_use]
pub fn resolve_exports(exports: &Value, subpath: &str, conditions: &[&str]) -> Option<String> {
    if subpath != "." && !subpath.starts_with("./") {
        return None;
    }

    let Some(obj) = exports.as_object().filter(|obj| has_subpath_keys(obj)) else {
        // String, array or a bare conditions object describe the root only
        return if subpath == "." {
            resolve_target(exports, conditions, 0)
        } else {
            None
        };
    };

    if let Some(target) = obj.get(subpath) {
        return resolve_target(target, conditions, 0);
    }

    resolve_pattern(obj, subpath, conditions)
}

/// Root entry of a package's `exports`.
#[must_use]
pub fn resolve_exports_root(exports: &Value, conditions: &[&str]) -> Option<String> {
    resolve_exports(exports, ".", conditions)
}

fn has_subpath_keys(obj: &serde_json::Map<String, Value>) -> bool {
    obj.keys().any(|k| k.starts_with('.'))
}

fn resolve_pattern(
    obj: &serde_json::Map<String, Value>,
    subpath: &str,
    conditions: &[&str],
) -> Option<String> {
    let mut best: Option<(&str, &Value, String)> = None;

    for (key, value) in obj {
        if key.matches('*').count() != 1 || !key.starts_with("./") {
            continue;
        }
        let Some(star) = match_pattern(key, subpath) else {
            continue;
        };
        // Most specific (longest) key wins
        if best.as_ref().is_some_and(|(k, _, _)| key.len() <= k.len()) {
            continue;
        }
        best = Some((key, value, star));
    }

    let (_, target, star) = best?;
    let target = resolve_target(target, conditions, 0)?;
    substitute_star(&target, &star)
}

/// Match a pattern key against a subpath, returning the `*` value.
fn match_pattern(pattern: &str, subpath: &str) -> Option<String> {
    let (prefix, suffix) = pattern.split_once('*')?;

    if !subpath.starts_with(prefix) || !subpath.ends_with(suffix) {
        return None;
    }
    let start = prefix.len();
    let end = subpath.len() - suffix.len();
    if start >= end {
        return None;
    }
    Some(subpath[start..end].to_string())
}

fn substitute_star(target: &str, star: &str) -> Option<String> {
    if !target.contains('*') {
        return None;
    }
    let result = target.replace('*', star);
    if result.split('/').any(|segment| segment == "..") {
        return None;
    }
    validate_export_path(&result)
}

/// Resolve a target: string, fallback array, or conditions object.
fn resolve_target(target: &Value, conditions: &[&str], depth: usize) -> Option<String> {
    if depth > MAX_CONDITION_DEPTH {
        return None;
    }

    match target {
        Value::String(s) => validate_export_path(s),
        Value::Array(items) => items
            .iter()
            .find_map(|item| resolve_target(item, conditions, depth + 1)),
        Value::Object(obj) => conditions
            .iter()
            .filter_map(|condition| obj.get(*condition))
            .find_map(|nested| resolve_target(nested, conditions, depth + 1)),
        _ => None,
    }
}

/// Export targets must be package-relative.
fn validate_export_path(path: &str) -> Option<String> {
    path.starts_with("./").then(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exports_string_root() {
        let exports = json!("./dist/index.js");
        assert_eq!(
            resolve_exports_root(&exports, REQUIRE_CONDITIONS),
            Some("./dist/index.js".to_string())
        );
        assert_eq!(resolve_exports(&exports, "./x", REQUIRE_CONDITIONS), None);
    }

    #[test]
    fn test_exports_prefers_require_over_import() {
        let exports = json!({
            ".": {
                "import": "./esm.mjs",
                "require": "./cjs.js",
                "default": "./d.js"
            }
        });
        assert_eq!(
            resolve_exports_root(&exports, REQUIRE_CONDITIONS),
            Some("./cjs.js".to_string())
        );
    }

    #[test]
    fn test_exports_node_then_default() {
        let exports = json!({ "import": "./esm.mjs", "node": "./node.js", "default": "./d.js" });
        assert_eq!(
            resolve_exports_root(&exports, REQUIRE_CONDITIONS),
            Some("./node.js".to_string())
        );

        let only_default = json!({ ".": { "import": "./esm.mjs", "default": "./d.js" } });
        assert_eq!(
            resolve_exports_root(&only_default, REQUIRE_CONDITIONS),
            Some("./d.js".to_string())
        );
    }

    #[test]
    fn test_exports_import_only_unresolvable() {
        let exports = json!({ ".": { "import": "./esm.mjs" } });
        assert_eq!(resolve_exports_root(&exports, REQUIRE_CONDITIONS), None);
    }

    #[test]
    fn test_exports_nested_conditions() {
        let exports = json!({
            ".": {
                "node": { "import": "./n.mjs", "require": "./n.cjs" },
                "default": "./d.js"
            }
        });
        assert_eq!(
            resolve_exports_root(&exports, REQUIRE_CONDITIONS),
            Some("./n.cjs".to_string())
        );
    }

    #[test]
    fn test_exports_fallback_array() {
        let exports = json!({ ".": ["invalid", "./second.js"] });
        assert_eq!(
            resolve_exports_root(&exports, REQUIRE_CONDITIONS),
            Some("./second.js".to_string())
        );
    }

    #[test]
    fn test_exports_subpath_exact() {
        let exports = json!({
            ".": "./index.js",
            "./throttle": { "require": "./throttle.js" },
            "./package.json": "./package.json"
        });
        assert_eq!(
            resolve_exports(&exports, "./throttle", REQUIRE_CONDITIONS),
            Some("./throttle.js".to_string())
        );
        assert_eq!(resolve_exports(&exports, "./missing", REQUIRE_CONDITIONS), None);
    }

    #[test]
    fn test_exports_pattern_most_specific() {
        let exports = json!({
            "./*": "./dist/*.js",
            "./lib/*": "./dist/lib/*.cjs"
        });
        assert_eq!(
            resolve_exports(&exports, "./lib/util", REQUIRE_CONDITIONS),
            Some("./dist/lib/util.cjs".to_string())
        );
        assert_eq!(
            resolve_exports(&exports, "./other", REQUIRE_CONDITIONS),
            Some("./dist/other.js".to_string())
        );
    }

    #[test]
    fn test_exports_pattern_rejects_traversal() {
        let exports = json!({ "./*": "./dist/*" });
        assert_eq!(resolve_exports(&exports, "./../secret", REQUIRE_CONDITIONS), None);
    }

    #[test]
    fn test_exports_invalid_targets_ignored() {
        assert_eq!(resolve_exports_root(&json!("lodash"), REQUIRE_CONDITIONS), None);
        assert_eq!(resolve_exports_root(&json!("/abs.js"), REQUIRE_CONDITIONS), None);
        assert_eq!(resolve_exports_root(&json!(null), REQUIRE_CONDITIONS), None);
    }

    #[test]
    fn test_types_condition() {
        let exports = json!({ ".": { "types": "./index.d.ts", "default": "./index.js" } });
        assert_eq!(
            resolve_exports_root(&exports, TYPES_CONDITIONS),
            Some("./index.d.ts".to_string())
        );
    }
}
