#![deny(missing_docs)]

//! # OAS Deref CLI
//!
//! Command Line Interface for the OpenAPI `$ref` resolver.
//!
//! Supported Commands:
//! - `resolve`: Resolves every reference of a document and prints the report.

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::error::CliResult;

mod error;
mod resolve;

#[derive(Parser, Debug)]
#[clap(author, version, about = "OpenAPI $ref resolver")]
struct Cli {
    /// Log more (`-v` enables debug output). `RUST_LOG` takes precedence.
    #[clap(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve every `$ref` in an OpenAPI document.
    Resolve(resolve::ResolveArgs),
}

fn init_logging(verbose: u8) {
    let default = if verbose > 0 { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Resolve(args) => {
            let report = resolve::execute(args)?;
            resolve::print_report(&report, args.json)?;
        }
    }

    Ok(())
}
