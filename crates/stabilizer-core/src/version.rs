//! npm version range matching on top of `semver`.
//!
//! `semver::VersionReq` follows Cargo semantics, which differ from npm in a
//! few places (a bare `1.2.3` is exact in npm but caret in Cargo, `1.2` is
//! an x-range in npm). Ranges are normalised to Cargo syntax first.

use semver::{Version, VersionReq};

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Outcome of checking a version against a declared range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeCheck {
    Satisfied,
    Violated,
    /// The range is not a semver range (git URL, tag, `file:`, ...).
    NotSemver,
}

/// Strip protocol prefixes that wrap a real range.
///
/// `workspace:^1.0.0` → `^1.0.0`, `npm:jest-worker@^29` → `^29`.
#[must_use]
pub fn strip_range_protocol(range: &str) -> &str {
    let range = range.trim();
    if let Some(rest) = range.strip_prefix("workspace:") {
        return rest.trim();
    }
    if let Some(rest) = range.strip_prefix("npm:") {
        // Skip a leading scope '@' when looking for the version separator
        return match rest.get(1..).and_then(|r| r.rfind('@')) {
            Some(idx) => rest[idx + 2..].trim(),
            None => "*",
        };
    }
    range
}

/// Check whether `version` satisfies the npm range `range`.
#[must_use]
pub fn check_range(version: &str, range: &str) -> RangeCheck {
    let Ok(version) = Version::parse(version.trim().trim_start_matches('v')) else {
        return RangeCheck::NotSemver;
    };
    let Some(reqs) = parse_npm_range(strip_range_protocol(range)) else {
        return RangeCheck::NotSemver;
    };
    if reqs.iter().any(|req| req.matches(&version)) {
        RangeCheck::Satisfied
    } else {
        RangeCheck::Violated
    }
}

/// Parse an npm range into its `||` alternatives.
///
/// Returns `None` when any alternative is not a semver range.
#[must_use]
pub fn parse_npm_range(range: &str) -> Option<Vec<VersionReq>> {
    let range = range.trim();
    if range.is_empty() || range == "*" || range.eq_ignore_ascii_case("x") {
        return Some(vec![VersionReq::STAR]);
    }

    range
        .split("||")
        .map(str::trim)
        .map(|alt| {
            if alt.is_empty() {
                Some(VersionReq::STAR)
            } else {
                parse_alternative(alt)
            }
        })
        .collect()
}

fn parse_alternative(alt: &str) -> Option<VersionReq> {
    // Hyphen ranges: "1.0.0 - 2.0.0" -> ">=1.0.0, <=2.0.0"
    if let Some((start, end)) = parse_hyphen_range(alt) {
        return VersionReq::parse(&format!(">={start}, <={end}")).ok();
    }

    let mut comparators = Vec::new();
    for token in join_operator_tokens(alt) {
        comparators.push(normalize_comparator(&token)?);
    }
    VersionReq::parse(&comparators.join(", ")).ok()
}

/// Parse a hyphen range like "1.0.0 - 2.0.0".
fn parse_hyphen_range(range: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = range.split(" - ").collect();
    if parts.len() == 2 {
        let start = parts[0].trim();
        let end = parts[1].trim();
        if !start.is_empty() && !end.is_empty() {
            return Some((start.to_string(), end.to_string()));
        }
    }
    None
}

/// Split on whitespace, re-attaching bare operators to the following version.
///
/// npm allows `>= 2.1.2 < 3.0.0`, meaning `>=2.1.2 AND <3.0.0`.
fn join_operator_tokens(range: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut pending = String::new();

    for part in range.split_whitespace() {
        pending.push_str(part);
        if token_has_version(&pending) {
            tokens.push(std::mem::take(&mut pending));
        }
    }
    if !pending.is_empty() {
        tokens.push(pending);
    }
    tokens
}

fn token_has_version(token: &str) -> bool {
    token
        .chars()
        .any(|c| c.is_ascii_digit() || c == '*' || c == 'x' || c == 'X')
}

/// Convert a single npm comparator into Cargo `VersionReq` syntax.
fn normalize_comparator(token: &str) -> Option<String> {
    const OPS: &[&str] = &[">=", "<=", ">", "<", "=", "~", "^"];

    let op = OPS.iter().find(|op| token.starts_with(**op)).copied().unwrap_or("");
    let rest = token[op.len()..].trim_start_matches(['v', '=']);
    if rest.is_empty() {
        return None;
    }

    // Prerelease and build metadata are carried through untouched
    let core = rest.split(['-', '+']).next().unwrap_or(rest);
    let is_wild = |p: &str| p == "x" || p == "X" || p == "*";
    let numeric = core
        .split('.')
        .take_while(|p| !is_wild(p))
        .collect::<Vec<_>>();

    if numeric.iter().any(|p| p.parse::<u64>().is_err()) {
        return None;
    }

    let partial = numeric.len() < 3;
    if !partial {
        // npm: a bare full version is an exact match
        let op = if op.is_empty() { "=" } else { op };
        return Some(format!("{op}{rest}"));
    }

    if op.is_empty() || op == "=" {
        // x-range: "1" / "1.x" -> ">=1.0.0, <2.0.0", "1.2" -> ">=1.2.0, <1.3.0"
        return Some(match numeric.as_slice() {
            [] => ">=0.0.0".to_string(),
            [major] => {
                let m: u64 = major.parse().ok()?;
                format!(">={m}.0.0, <{}.0.0", m + 1)
            }
            [major, minor] => {
                let m: u64 = major.parse().ok()?;
                let n: u64 = minor.parse().ok()?;
                format!(">={m}.{n}.0, <{m}.{}.0", n + 1)
            }
            _ => return None,
        });
    }

    if numeric.is_empty() {
        return Some(">=0.0.0".to_string());
    }
    Some(format!("{op}{}", numeric.join(".")))
}
