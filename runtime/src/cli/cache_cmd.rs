//! CLI handlers for `taproom cache` subcommands.

use crate::cache::BreweryCache;
use crate::cli::output;
use crate::config::PipelineConfig;
use crate::maintenance;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

fn open_cache() -> Result<BreweryCache> {
    let config = PipelineConfig::from_env();
    BreweryCache::open(&config)
        .with_context(|| format!("failed to open cache at {}", config.cache_db_path.display()))
}

/// Show cache statistics.
pub async fn run_stats() -> Result<()> {
    let stats = open_cache()?.stats()?;

    if output::is_json() {
        output::print_json(&serde_json::json!(stats));
    } else {
        println!("  Cache stats:");
        println!(
            "    Searches:  {} total, {} valid",
            stats.search_entries_total, stats.search_entries_valid
        );
        println!(
            "    Breweries: {} total, {} updated within {}h",
            stats.detail_entries_total, stats.detail_entries_recent, stats.ttl_hours
        );
    }
    Ok(())
}

/// Purge expired entries once.
pub async fn run_cleanup() -> Result<()> {
    let report = open_cache()?.cleanup_expired()?;

    if output::is_json() {
        output::print_json(&serde_json::json!(report));
    } else if !output::is_quiet() {
        println!(
            "  Removed {} expired search(es) and {} stale brewery record(s).",
            report.searches_removed, report.details_removed
        );
    }
    Ok(())
}

/// Drop cached searches for one postal code.
pub async fn run_clear(postal_code: &str) -> Result<()> {
    let removed = open_cache()?.clear_postal_code(postal_code.trim())?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "postal_code": postal_code,
            "removed": removed,
        }));
    } else if !output::is_quiet() {
        println!("  Cleared {removed} cached search(es) for {postal_code}.");
    }
    Ok(())
}

/// Run the maintenance loop in the foreground until Ctrl-C.
pub async fn run_watch(every_secs: Option<u64>) -> Result<()> {
    let cache = Arc::new(open_cache()?);
    let every = every_secs
        .map(|s| Duration::from_secs(s.max(1)))
        .unwrap_or_else(maintenance::tick_from_env);
    let shutdown = Arc::new(Notify::new());
    let handle = maintenance::spawn(cache, every, Arc::clone(&shutdown));

    if !output::is_quiet() {
        println!("  Cleaning the cache every {}s. Press Ctrl-C to stop.", every.as_secs());
    }
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    shutdown.notify_one();
    handle.await.context("maintenance loop panicked")?;
    Ok(())
}
