//! Module specifier helpers.
//!
//! Splits specifiers into package name and subpath, detects Node built-ins
//! and classifies a specifier against an externals map.

use crate::externals::ExternalsMap;

/// Node built-in modules (`require('module').builtinModules`).
pub const NODE_BUILTINS: &[&str] = &[
    "_http_agent",
    "_http_client",
    "_http_common",
    "_http_incoming",
    "_http_outgoing",
    "_http_server",
    "_stream_duplex",
    "_stream_passthrough",
    "_stream_readable",
    "_stream_transform",
    "_stream_wrap",
    "_stream_writable",
    "_tls_common",
    "_tls_wrap",
    "assert",
    "assert/strict",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "dns/promises",
    "domain",
    "events",
    "fs",
    "fs/promises",
    "http",
    "http2",
    "https",
    "inspector",
    "inspector/promises",
    "module",
    "net",
    "os",
    "path",
    "path/posix",
    "path/win32",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "readline/promises",
    "repl",
    "stream",
    "stream/consumers",
    "stream/promises",
    "stream/web",
    "string_decoder",
    "sys",
    "timers",
    "timers/promises",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "util/types",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// Extract the package name from a specifier.
///
/// `a/b` → `a`, `@a/b/c` → `@a/b`. Relative specifiers are returned unchanged.
#[must_use]
pub fn package_name(spec: &str) -> &str {
    if spec.starts_with('.') {
        return spec;
    }
    let segments = if spec.starts_with('@') { 2 } else { 1 };
    match spec.match_indices('/').nth(segments - 1) {
        Some((idx, _)) => &spec[..idx],
        None => spec,
    }
}

/// Split a specifier into `(package_name, subpath)`.
///
/// The subpath keeps its leading `/` and is empty for root specifiers.
#[must_use]
pub fn split_specifier(spec: &str) -> (&str, &str) {
    let name = package_name(spec);
    (name, &spec[name.len()..])
}

/// Whether a package name is scoped (`@scope/name`).
#[must_use]
pub fn is_scoped(name: &str) -> bool {
    name.starts_with('@') && name.contains('/')
}

/// Whether a specifier is relative to the importing file.
#[must_use]
pub fn is_relative(spec: &str) -> bool {
    spec.starts_with('.')
}

/// Whether a specifier names a Node built-in (with or without `node:`).
#[must_use]
pub fn is_builtin(spec: &str) -> bool {
    let bare = spec.strip_prefix("node:").unwrap_or(spec);
    NODE_BUILTINS.contains(&bare)
}

/// Whether `spec` is a subpath import, i.e. it has a remainder after its
/// package name other than `/package.json`.
#[must_use]
pub fn is_subpath(spec: &str) -> bool {
    if is_relative(spec) {
        return false;
    }
    let (_, subpath) = split_specifier(spec);
    !subpath.is_empty() && subpath != "/package.json"
}

/// Classification of a single specifier occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Node built-in module (or the `node` types reference).
    Builtin,
    /// Relative to the importing file.
    LocalRelative,
    /// Covered by the externals map. `key` is the matched map key (full
    /// specifier or package name) and `subpath` what follows it.
    ExternalAliased {
        key: String,
        alias: String,
        subpath: String,
    },
    /// A package that is not aliased.
    ExternalUnaliased { name: String, subpath: String },
}

/// Classify a specifier against an externals map.
///
/// An exact full-specifier entry wins over the package-name entry so that
/// secondary subpath artifacts can be addressed directly.
#[must_use]
pub fn classify(spec: &str, externals: &ExternalsMap) -> ReferenceKind {
    if is_relative(spec) {
        return ReferenceKind::LocalRelative;
    }

    if let Some(alias) = externals.get(spec) {
        return ReferenceKind::ExternalAliased {
            key: spec.to_string(),
            alias: alias.to_string(),
            subpath: String::new(),
        };
    }

    let (name, subpath) = split_specifier(spec);
    if is_builtin(spec) || is_builtin(name) || name == "node" {
        return ReferenceKind::Builtin;
    }

    match externals.get(name) {
        Some(alias) => ReferenceKind::ExternalAliased {
            key: name.to_string(),
            alias: alias.to_string(),
            subpath: subpath.to_string(),
        },
        None => ReferenceKind::ExternalUnaliased {
            name: name.to_string(),
            subpath: subpath.to_string(),
        },
    }
}
