//! `taproom search <postal-code>`: discover breweries and their tap lists.

use crate::cli::output;
use crate::config::PipelineConfig;
use crate::model::serializer::serialize_breweries;
use crate::orchestrator::AcquisitionOrchestrator;
use anyhow::{bail, Result};
use std::sync::Arc;

/// Run the search command.
pub async fn run(postal_code: &str, radius_miles: u32, fresh: bool, no_taps: bool) -> Result<()> {
    let postal_code = postal_code.trim();
    if postal_code.is_empty() {
        bail!("postal code must not be empty");
    }
    if radius_miles == 0 {
        bail!("radius must be at least 1 mile");
    }

    let config = Arc::new(PipelineConfig::from_env());
    if config.places_api_key.is_none() && !output::is_quiet() && !output::is_json() {
        eprintln!("  Warning: GOOGLE_PLACES_API_KEY is not set; discovery will find nothing.");
    }

    let orchestrator = AcquisitionOrchestrator::from_config(config)?;
    let breweries = if no_taps {
        orchestrator.discover_only(postal_code, radius_miles).await
    } else if fresh {
        orchestrator.acquire_fresh(postal_code, radius_miles).await
    } else {
        orchestrator.acquire(postal_code, radius_miles).await
    };

    if output::is_json() {
        output::print_json(&serialize_breweries(&breweries));
        return Ok(());
    }

    if no_taps {
        if !output::is_quiet() {
            println!("  {} breweries within {radius_miles} mi of {postal_code}\n", breweries.len());
        }
        output::print_breweries(&breweries, false);
        return Ok(());
    }

    if !output::is_quiet() {
        let with_beers = breweries.iter().filter(|b| !b.beers.is_empty()).count();
        println!(
            "  {} breweries within {radius_miles} mi of {postal_code} ({with_beers} with tap lists)\n",
            breweries.len()
        );
    }
    output::print_breweries(&breweries, true);
    Ok(())
}
