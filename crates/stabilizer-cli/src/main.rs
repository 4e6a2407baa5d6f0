#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stabilizer")]
#[command(author, version, about = "Vendor npm dependencies into a self-contained compiled tree", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Vendor every configured dependency
    Vendor {
        /// Config file (default: stabilizer.config.json, then the
        /// "stabilizer" field of package.json)
        #[arg(long, short = 'c', value_name = "FILE")]
        config: Option<PathBuf>,

        /// Output directory, relative to the working directory
        #[arg(long, short = 'o', value_name = "DIR")]
        out: Option<String>,

        /// Cancel remaining dependencies after the first failure
        #[arg(long)]
        fail_fast: bool,

        /// Bundler executable (default: esbuild from node_modules/.bin or PATH)
        #[arg(long, value_name = "PATH", env = "STABILIZER_BUNDLER")]
        bundler: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let cwd = if cwd.is_absolute() {
        cwd
    } else {
        std::env::current_dir().map_or(cwd.clone(), |dir| dir.join(&cwd))
    };

    logging::init(cli.verbose, cli.json);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(cli.json),
        Some(Commands::Vendor {
            config,
            out,
            fail_fast,
            bundler,
        }) => {
            let args = commands::vendor::VendorArgs {
                config,
                out,
                fail_fast,
                bundler,
            };
            commands::vendor::run(&cwd, &args, cli.json)
        }
    }
}
