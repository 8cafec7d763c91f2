//! `taproom scrape <url>`: run the tap-list scraper against one website.

use crate::acquisition::{ScrapeOutcome, TapListScraper};
use crate::cli::output;
use crate::config::PipelineConfig;
use anyhow::Result;
use std::sync::Arc;

/// Run the scrape command.
pub async fn run(url: &str) -> Result<()> {
    let scraper = TapListScraper::new(Arc::new(PipelineConfig::from_env()));
    let outcome = scraper.scrape_url(url).await?;

    if output::is_json() {
        let found = !outcome.is_empty();
        let beers = outcome.into_beers();
        output::print_json(&serde_json::json!({
            "url": url,
            "found": found,
            "beers": beers,
        }));
        return Ok(());
    }

    match outcome {
        ScrapeOutcome::Success(beers) => {
            if !output::is_quiet() {
                println!("  {} beer(s) on tap at {url}\n", beers.len());
            }
            for beer in &beers {
                let style = beer.style.as_deref().unwrap_or("-");
                let abv = beer.abv.map(|a| format!("{a:.1}%")).unwrap_or_else(|| "-".into());
                println!("    {:<32}  {:<28}  {abv}", beer.name, style);
            }
        }
        ScrapeOutcome::Empty => println!("  No tap list found at {url}."),
    }
    Ok(())
}
