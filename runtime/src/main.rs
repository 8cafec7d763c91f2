// Copyright 2026 Taproom Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use taproom_runtime::cli;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "taproom",
    about = "Taproom: find nearby breweries and what they have on tap",
    version,
    after_help = "Run 'taproom <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover breweries near a postal code and scrape their tap lists
    Search {
        /// Postal code to search around (e.g. "94556")
        postal_code: String,
        /// Search radius in miles
        #[arg(long, default_value = "15")]
        radius: u32,
        /// Ignore any cached result and search again
        #[arg(long)]
        fresh: bool,
        /// List breweries only, without visiting their websites
        #[arg(long, conflicts_with = "fresh")]
        no_taps: bool,
    },
    /// Scrape the tap list from a single brewery website
    Scrape {
        /// Brewery website (scheme optional)
        url: String,
    },
    /// Inspect and maintain the local cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show entry counts and TTL
    Stats,
    /// Remove expired searches and stale brewery records
    Cleanup,
    /// Remove cached searches for a postal code
    Clear {
        /// Postal code to clear
        postal_code: String,
    },
    /// Run periodic cleanup in the foreground
    Watch {
        /// Seconds between cleanups
        #[arg(long)]
        every: Option<u64>,
    },
}

fn init_tracing(verbose: bool, json: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::from_default_env().add_directive(format!("taproom_runtime={level}").parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Global flags travel through the environment so every command can check them.
    if cli.json {
        std::env::set_var("TAPROOM_JSON", "1");
    }
    if cli.quiet {
        std::env::set_var("TAPROOM_QUIET", "1");
    }
    init_tracing(cli.verbose, cli.json)?;

    let result = match cli.command {
        Commands::Search {
            postal_code,
            radius,
            fresh,
            no_taps,
        } => cli::search_cmd::run(&postal_code, radius, fresh, no_taps).await,
        Commands::Scrape { url } => cli::scrape_cmd::run(&url).await,
        Commands::Cache { action } => match action {
            CacheAction::Stats => cli::cache_cmd::run_stats().await,
            CacheAction::Cleanup => cli::cache_cmd::run_cleanup().await,
            CacheAction::Clear { postal_code } => cli::cache_cmd::run_clear(&postal_code).await,
            CacheAction::Watch { every } => cli::cache_cmd::run_watch(every).await,
        },
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "taproom", &mut std::io::stdout());
            Ok(())
        }
    };

    // Exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else if !cli::output::is_quiet() {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}
