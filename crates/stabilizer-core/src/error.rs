use std::path::PathBuf;
use thiserror::Error;

/// Core error type for stabilizer operations.
///
/// These are the failures that abort vendoring of a single dependency.
/// Recoverable conditions (version conflicts, missing declarations, patch
/// failures) are reported as [`crate::vendor::VendorWarning`]s instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Package '{name}' not found from {search_dir}")]
    PackageNotFound { name: String, search_dir: PathBuf },

    #[error("Invalid package.json at {path}: {message}")]
    ManifestInvalid { path: PathBuf, message: String },

    #[error("Bundling '{name}' failed: {message}")]
    Bundle { name: String, message: String },

    #[error("Vendoring of '{name}' was cancelled")]
    Cancelled { name: String },

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    #[must_use]
    pub fn package_not_found(name: &str, search_dir: impl Into<PathBuf>) -> Self {
        Self::PackageNotFound {
            name: name.to_string(),
            search_dir: search_dir.into(),
        }
    }

    #[must_use]
    pub fn bundle(name: &str, message: impl Into<String>) -> Self {
        Self::Bundle {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Stable code for machine-readable reports.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO_ERROR",
            Self::ConfigRead { .. } => "CONFIG_READ_FAILED",
            Self::ConfigParse { .. } => "CONFIG_PARSE_FAILED",
            Self::PackageNotFound { .. } => "PACKAGE_NOT_FOUND",
            Self::ManifestInvalid { .. } => "MANIFEST_INVALID",
            Self::Bundle { .. } => "BUNDLE_FAILED",
            Self::Cancelled { .. } => "CANCELLED",
            Self::Other(_) => "OTHER",
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
