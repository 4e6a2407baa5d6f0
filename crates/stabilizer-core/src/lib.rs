#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod config;
pub mod conflict;
pub mod dts;
pub mod error;
pub mod externals;
pub mod graph;
pub mod relocate;
pub mod resolver;
pub mod rewrite;
pub mod specifier;
pub mod subpath;
pub mod syntax;
pub mod vendor;
pub mod version;

pub use config::{load_config, Mode, NormalizedDep, StabilizerConfig};
pub use conflict::{ConflictResolver, VersionConflict};
pub use error::{Error, Result};
pub use externals::ExternalsMap;
pub use graph::DependencyGraphWalker;
pub use resolver::{PackageResolver, ResolvedPackage};
pub use subpath::SubpathDetector;
pub use vendor::{Bundler, CancelToken, DepReport, RunReport, Vendorer};
pub use version::VERSION;
