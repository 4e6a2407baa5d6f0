//! `package.json` model.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// The subset of `package.json` the vendoring pipeline reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub private: bool,
    #[serde(default, deserialize_with = "lenient_map")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub peer_dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exports: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<Value>,
}

/// Manifest written next to vendored output. Absent fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrimmedManifest {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typings: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exports: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin: Option<Value>,
}

impl PackageManifest {
    /// Read and parse a manifest file.
    ///
    /// # Errors
    /// Returns `Error::Io` if the file cannot be read and
    /// `Error::ManifestInvalid` if it is not a JSON object.
    pub fn read(path: &Path) -> Result<Self> {
        let content = stabilizer_util::fs::read_to_string_lossy(path)?;
        Self::parse(&content).map_err(|message| Error::ManifestInvalid {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse manifest JSON.
    ///
    /// # Errors
    /// Returns the parser message when the JSON is invalid.
    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        serde_json::from_str(content).map_err(|e| e.to_string())
    }

    /// `dependencies` followed by `peerDependencies`.
    pub fn runtime_dependencies(&self) -> impl Iterator<Item = (&str, &str)> {
        self.dependencies
            .iter()
            .chain(self.peer_dependencies.iter())
            .map(|(name, range)| (name.as_str(), range.as_str()))
    }

    /// `types`, falling back to `typings`.
    #[must_use]
    pub fn types_field(&self) -> Option<&str> {
        self.types.as_deref().or(self.typings.as_deref())
    }

    /// Whether the manifest declares any runtime entry point.
    #[must_use]
    pub fn has_entry(&self) -> bool {
        self.main.is_some() || self.module.is_some() || self.exports.is_some()
    }

    /// A private manifest without entry points placed next to bundled code.
    #[must_use]
    pub fn is_decoy(&self) -> bool {
        self.private && !self.has_entry()
    }

    /// Manifest for bundle mode: identity plus declaration fields.
    #[must_use]
    pub fn bundle_manifest(&self) -> TrimmedManifest {
        TrimmedManifest {
            name: self.name.clone(),
            version: self.version.clone(),
            types: self.types.clone(),
            typings: self.typings.clone(),
            ..TrimmedManifest::default()
        }
    }

    /// Manifest for bundle-less mode, keeping the entry fields of the
    /// copied tree.
    #[must_use]
    pub fn bundle_less_manifest(&self) -> TrimmedManifest {
        TrimmedManifest {
            name: self.name.clone(),
            version: self.version.clone(),
            types: self.types_field().map(str::to_string),
            typings: None,
            main: self.main.clone(),
            module: self.module.clone(),
            exports: self.exports.clone(),
            bin: self.bin.clone(),
        }
    }
}

impl TrimmedManifest {
    /// Write as pretty JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| Error::other(e.to_string()))?;
        stabilizer_util::fs::atomic_write(path, json.as_bytes())?;
        Ok(())
    }
}

// `"private": "true"` appears in the wild.
fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => s == "true",
        _ => false,
    })
}

// Non-string ranges are dropped rather than failing the whole manifest.
fn lenient_map<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
            .collect(),
        _ => BTreeMap::new(),
    })
}
