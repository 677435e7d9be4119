#![deny(missing_docs)]

//! # Resolve Command
//!
//! Loads an OpenAPI document from disk, resolves every `$ref` in it and prints
//! the resolution report.

use crate::error::CliResult;
use oas_deref_core::{
    parse_document, AuthorizationValue, DefaultFetcher, Document, OpenApiResolver,
    ResolutionReport, ResolveOptions,
};
use std::fs;
use std::path::PathBuf;
#[cfg(feature = "client")]
use std::time::Duration;
use tracing::{info, warn};

/// Arguments for the resolve command.
#[derive(clap::Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Path to the OpenAPI document (YAML or JSON).
    pub file: PathBuf,

    /// Abort on the first external fetch or parse failure.
    #[clap(long, env = "OAS_DEREF_STRICT")]
    pub strict: bool,

    /// Locator relative external references are resolved against.
    /// Defaults to the input file path.
    #[clap(long)]
    pub base: Option<String>,

    /// Credential sent with every external fetch.
    /// Format: `header:NAME:VALUE` or `query:NAME:VALUE`. Repeatable.
    #[clap(long = "auth", value_name = "LOCATION:NAME:VALUE")]
    pub auth: Vec<AuthorizationValue>,

    /// Per-request timeout for HTTP fetches, in seconds.
    #[clap(long)]
    pub timeout: Option<u64>,

    /// Print the report as JSON.
    #[clap(long)]
    pub json: bool,
}

/// Resolves the document named by `args` and returns the report.
pub fn execute(args: &ResolveArgs) -> CliResult<ResolutionReport> {
    info!("Resolving {}", args.file.display());
    let bytes = fs::read(&args.file)?;
    let value = parse_document(&bytes)?;
    let mut document = Document::from_value(&value)?;

    let base = args
        .base
        .clone()
        .unwrap_or_else(|| args.file.to_string_lossy().into_owned());
    let options = ResolveOptions::new().strict(args.strict).base_locator(base);

    let fetcher = build_fetcher(args.timeout);
    let report = OpenApiResolver::new(&fetcher)
        .with_credentials(args.auth.clone())
        .with_options(options)
        .resolve(&mut document)?;

    Ok(report)
}

#[cfg(feature = "client")]
fn build_fetcher(timeout: Option<u64>) -> DefaultFetcher {
    match timeout {
        Some(secs) => DefaultFetcher::new().with_timeout(Duration::from_secs(secs)),
        None => DefaultFetcher::new(),
    }
}

#[cfg(not(feature = "client"))]
fn build_fetcher(timeout: Option<u64>) -> DefaultFetcher {
    if timeout.is_some() {
        warn!("--timeout has no effect: built without the 'client' feature");
    }
    DefaultFetcher::new()
}

/// Writes the report to stdout, as text or JSON.
pub fn print_report(report: &ResolutionReport, json: bool) -> CliResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for warning in &report.warnings {
        println!(
            "warning[{}]: {} at {}: {}",
            warning.kind, warning.reference, warning.site, warning.message
        );
    }
    println!(
        "Resolved {} reference sites, fetched {} external documents, {} unresolved.",
        report.resolved_sites,
        report.fetched_documents,
        report.warnings.len()
    );
    if !report.is_clean() {
        warn!("{} references left unresolved", report.warnings.len());
    }
    Ok(())
}
