#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::cast_precision_loss)]

mod logging;
mod render;

use clap::Parser;
use hefty_core::{analyze, default_registry, AnalyzeOptions, DEFAULT_REGISTRY};
use miette::{IntoDiagnostic, Result, WrapErr};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hefty")]
#[command(author, version, about = "Weigh the installed size of a yarn dependency tree", long_about = None)]
struct Cli {
    /// Registry server for package metadata (default: .npmrc, then the public registry)
    #[arg(long, value_name = "URL")]
    registry: Option<String>,

    /// Count devDependencies and optionalDependencies of local packages too
    #[arg(long)]
    development: bool,

    /// Entry folder for the analysis (a workspace package, or the project root)
    #[arg(short, long, value_name = "PATH")]
    root: Option<PathBuf>,

    /// Allow one dependency to be counted under different packages
    #[arg(short, long)]
    duplicate: bool,

    /// Package names to exclude, comma separated
    #[arg(short, long, value_delimiter = ',', value_name = "NAME")]
    exclude: Vec<String>,

    /// Ignore the entry package's own size
    #[arg(short, long)]
    ignore_entry: bool,

    /// Analyze every package in the workspaces
    #[arg(short, long)]
    all: bool,

    /// File path of the generated JSON report
    #[arg(short, long, default_value = "report.json", value_name = "PATH")]
    output: PathBuf,

    /// Print the report JSON to stdout instead of a rendered tree
    #[arg(long)]
    json: bool,

    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cwd = std::env::current_dir().into_diagnostic()?;
    let entry = match &cli.root {
        Some(root) => cwd.join(root),
        None => cwd.clone(),
    };

    let registry = cli
        .registry
        .clone()
        .or_else(|| default_registry(&cwd).map(|url| url.to_string()))
        .unwrap_or_else(|| DEFAULT_REGISTRY.to_string());
    tracing::debug!(%registry, "using registry");

    let mut options = AnalyzeOptions::new(entry);
    options.registry = registry;
    options.production = !cli.development;
    options.exclude = cli
        .exclude
        .iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect::<HashSet<_>>();
    options.ignore_entry = cli.ignore_entry;
    options.all = cli.all;
    options.allow_duplicate = cli.duplicate;

    let trees = analyze(&cwd, options).await.into_diagnostic()?;

    let report = serde_json::to_string_pretty(&trees).into_diagnostic()?;
    fs::write(&cli.output, &report)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to write report to {}", cli.output.display()))?;
    tracing::info!(path = %cli.output.display(), "report written");

    if cli.json {
        println!("{report}");
    } else {
        print!("{}", render::render(&trees));
    }
    Ok(())
}
