//! losangeles CLI - content engine front end.
//!
//! Provides commands for:
//! - `load`: Resolve a URL to its content document and print it
//! - `route`: Show how a request would be dispatched (rules, redirects, rewrites)

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{LoadArgs, RouteArgs};
use output::Output;

/// losangeles - content engine for file-based sites.
#[derive(Parser)]
#[command(name = "la", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the content document for a URL.
    Load(LoadArgs),
    /// Dispatch a request through URL rules and document redirects.
    Route(RouteArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = match &cli.command {
        Commands::Load(args) => args.site.verbose,
        Commands::Route(args) => args.site.verbose,
    };

    // --verbose enables DEBUG for the engine, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("info,la_site=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let result = rt.block_on(async {
        match cli.command {
            Commands::Load(args) => args.execute().await,
            Commands::Route(args) => args.execute().await,
        }
    });

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
