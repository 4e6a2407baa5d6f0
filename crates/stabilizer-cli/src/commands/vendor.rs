use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use stabilizer_core::config::{load_config, FailurePolicy};
use stabilizer_core::vendor::{CommandBundler, RunReport, Vendorer};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Options of the `vendor` command that override the loaded config.
#[derive(Debug, Clone, Default)]
pub struct VendorArgs {
    pub config: Option<PathBuf>,
    pub out: Option<String>,
    pub fail_fast: bool,
    pub bundler: Option<PathBuf>,
}

/// JSON output of `stabilizer vendor --json`.
#[derive(Serialize)]
struct VendorOutput<'a> {
    ok: bool,
    out: PathBuf,
    #[serde(flatten)]
    report: &'a RunReport,
}

/// Run the vendor command.
///
/// Exits with status 1 when any dependency failed; the report is printed
/// first either way.
pub fn run(cwd: &Path, args: &VendorArgs, json: bool) -> Result<()> {
    let mut config = load_config(cwd, args.config.as_deref()).into_diagnostic()?;
    if let Some(out) = &args.out {
        config.out.clone_from(out);
    }
    if args.fail_fast {
        config.failure_policy = FailurePolicy::FailFast;
    }
    if config.deps.is_empty() {
        info!(cwd = %cwd.display(), "no dependencies configured");
    }

    let out = config.out_root();
    let mut vendorer = Vendorer::new(config);
    if let Some(program) = &args.bundler {
        vendorer = vendorer.with_bundler(Arc::new(CommandBundler::new(program)));
    }
    let report = vendorer.run().into_diagnostic()?;

    if json {
        let output = VendorOutput {
            ok: report.is_success(),
            out,
            report: &report,
        };
        println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
    } else {
        print_human(&report).into_diagnostic()?;
    }

    if report.is_success() {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

fn print_human(report: &RunReport) -> io::Result<()> {
    let mut out = io::stdout().lock();

    for dep in &report.succeeded {
        writeln!(
            out,
            "vendored {}@{} ({} files, {}ms)",
            dep.name,
            dep.version,
            dep.files.len(),
            dep.duration_ms
        )?;
        for spec in &dep.subpaths {
            writeln!(out, "  + {spec}")?;
        }
        for warning in &dep.warnings {
            writeln!(out, "  ! {}: {}", warning.code, warning.message)?;
        }
    }
    for failure in &report.failed {
        writeln!(out, "failed {}: {} {}", failure.name, failure.code, failure.message)?;
    }

    writeln!(
        out,
        "\n{} vendored, {} failed, {} warnings in {}ms",
        report.succeeded.len(),
        report.failed.len(),
        report.warning_count(),
        report.duration_ms
    )
}
