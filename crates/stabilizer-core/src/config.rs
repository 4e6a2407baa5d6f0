//! Run configuration.
//!
//! Read from `stabilizer.config.json` or the `"stabilizer"` field of the
//! consumer `package.json`, then normalised into one [`NormalizedDep`] per
//! vendored package.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dts::DtsInfo;
use crate::error::{Error, Result};
use crate::externals::ExternalsMap;

/// Config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "stabilizer.config.json";

/// `package.json` field holding inline configuration.
pub const PACKAGE_JSON_FIELD: &str = "stabilizer";

/// Default output directory, relative to the working directory.
pub const DEFAULT_OUT: &str = "compiled";

/// How a dependency is vendored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Bundle into a single `index.js`.
    #[default]
    Bundle,
    /// Copy the package tree and rewrite its specifiers.
    #[serde(alias = "bundless")]
    BundleLess,
}

impl Mode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bundle => "bundle",
            Self::BundleLess => "bundle-less",
        }
    }
}

/// What happens to the rest of a run when one dependency fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Cancel dependencies that have not finished yet.
    FailFast,
    /// Let every other dependency finish.
    #[default]
    Continue,
}

/// Arguments handed to a patch hook after a dependency is vendored.
#[derive(Debug)]
pub struct PatchContext<'a> {
    pub dep: &'a NormalizedDep,
    /// Output path of the entry declaration, when declarations were copied.
    pub out_dts_path: Option<&'a Path>,
    pub dts_info: Option<&'a DtsInfo>,
}

type PatchFn = dyn Fn(&PatchContext<'_>) -> std::result::Result<(), String> + Send + Sync;

/// Post-vendoring callback, e.g. to copy extra files into the output.
#[derive(Clone)]
pub struct PatchHook(Arc<PatchFn>);

impl PatchHook {
    pub fn new(
        hook: impl Fn(&PatchContext<'_>) -> std::result::Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(hook))
    }

    /// Run the hook.
    ///
    /// # Errors
    /// Returns the hook's own error message.
    pub fn call(&self, ctx: &PatchContext<'_>) -> std::result::Result<(), String> {
        (self.0)(ctx)
    }
}

impl fmt::Debug for PatchHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PatchHook")
    }
}

/// One dependency as written by the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDepConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minify: Option<bool>,
    #[serde(default, skip_serializing_if = "ExternalsMap::is_empty")]
    pub externals: ExternalsMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dts: Option<bool>,
    /// Only copy declarations; no runtime output.
    #[serde(default)]
    pub dts_only: bool,
    #[serde(skip)]
    pub patch: Option<PatchHook>,
}

impl UserDepConfig {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A dependency entry: a bare name or a full object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DepEntry {
    Name(String),
    Config(UserDepConfig),
}

impl DepEntry {
    #[must_use]
    pub fn into_config(self) -> UserDepConfig {
        match self {
            Self::Name(name) => UserDepConfig::new(name),
            Self::Config(config) => config,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilizerConfig {
    #[serde(default = "default_out")]
    pub out: String,
    /// Working directory. Relative values are taken from where the config
    /// was found.
    #[serde(default)]
    pub cwd: PathBuf,
    /// Externals shared by every dependency.
    #[serde(default)]
    pub externals: ExternalsMap,
    #[serde(default)]
    pub deps: Vec<DepEntry>,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_out() -> String {
    DEFAULT_OUT.to_string()
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            out: default_out(),
            cwd: PathBuf::new(),
            externals: ExternalsMap::new(),
            deps: Vec::new(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// A dependency with every default applied.
#[derive(Debug, Clone)]
pub struct NormalizedDep {
    /// Configured name. May be an npm alias differing from the manifest name.
    pub name: String,
    pub mode: Mode,
    pub minify: bool,
    pub dts: bool,
    pub dts_only: bool,
    pub clean: bool,
    /// `<cwd>/<out>/<name>/index.js`
    pub output: PathBuf,
    /// Directory of `output`.
    pub out_dir: PathBuf,
    /// Per-dependency externals overrides.
    pub externals: ExternalsMap,
    pub patch: Option<PatchHook>,
}

impl StabilizerConfig {
    /// Parse configuration JSON.
    ///
    /// # Errors
    /// Returns `Error::ConfigParse` on malformed input.
    pub fn from_json(content: &str, path: &Path) -> Result<Self> {
        serde_json::from_str(content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Output root, `<cwd>/<out>`.
    #[must_use]
    pub fn out_root(&self) -> PathBuf {
        self.cwd.join(&self.out)
    }

    /// Names of every configured dependency, in order.
    pub fn dep_names(&self) -> impl Iterator<Item = &str> {
        self.deps.iter().map(|entry| match entry {
            DepEntry::Name(name) => name.as_str(),
            DepEntry::Config(config) => config.name.as_str(),
        })
    }

    /// Apply defaults to every dependency.
    ///
    /// # Errors
    /// Returns an error for an empty or duplicated dependency name.
    pub fn normalize(&self) -> Result<Vec<NormalizedDep>> {
        let mut seen = BTreeSet::new();
        let root = self.out_root();

        self.deps
            .iter()
            .cloned()
            .map(DepEntry::into_config)
            .map(|dep| {
                if dep.name.trim().is_empty() {
                    return Err(Error::other("dependency with empty name in config"));
                }
                if !seen.insert(dep.name.clone()) {
                    return Err(Error::other(format!(
                        "dependency '{}' is configured more than once",
                        dep.name
                    )));
                }

                let out_dir = root.join(&dep.name);
                Ok(NormalizedDep {
                    output: out_dir.join("index.js"),
                    out_dir,
                    mode: dep.mode.unwrap_or_default(),
                    minify: dep.minify.unwrap_or(true),
                    dts: dep.dts.unwrap_or(true),
                    dts_only: dep.dts_only,
                    clean: dep.clean.unwrap_or(true),
                    externals: dep.externals,
                    patch: dep.patch,
                    name: dep.name,
                })
            })
            .collect()
    }
}

/// Find `stabilizer.config.json` in `cwd`.
#[must_use]
pub fn find_config_file(cwd: &Path) -> Option<PathBuf> {
    let path = cwd.join(CONFIG_FILE_NAME);
    path.is_file().then_some(path)
}

/// Load configuration for `cwd`.
///
/// `explicit` overrides discovery. Without it, `stabilizer.config.json` is
/// used, then the `"stabilizer"` field of `package.json`, then defaults.
/// The returned config's `cwd` is absolute whenever `cwd` is.
///
/// # Errors
/// Returns `Error::ConfigRead` / `Error::ConfigParse` for an unreadable or
/// malformed config source.
pub fn load_config(cwd: &Path, explicit: Option<&Path>) -> Result<StabilizerConfig> {
    let mut config = match explicit.map(Path::to_path_buf).or_else(|| find_config_file(cwd)) {
        Some(path) => {
            debug!(path = %path.display(), "loading config file");
            let content = read_config(&path)?;
            StabilizerConfig::from_json(&content, &path)?
        }
        None => from_package_json(cwd)?.unwrap_or_default(),
    };

    config.cwd = if config.cwd.as_os_str().is_empty() {
        cwd.to_path_buf()
    } else {
        cwd.join(&config.cwd)
    };
    Ok(config)
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
        path: path.to_path_buf(),
        source,
    })
}

fn from_package_json(cwd: &Path) -> Result<Option<StabilizerConfig>> {
    let path = cwd.join("package.json");
    if !path.is_file() {
        return Ok(None);
    }
    let content = read_config(&path)?;
    let manifest: serde_json::Value =
        serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.clone(),
            source,
        })?;

    let Some(field) = manifest.get(PACKAGE_JSON_FIELD) else {
        return Ok(None);
    };
    debug!(path = %path.display(), "loading config from package.json");
    serde_json::from_value(field.clone())
        .map(Some)
        .map_err(|source| Error::ConfigParse { path, source })
}
