//! Output mode flags and printing helpers shared by every command.

use crate::model::Brewery;

pub fn is_json() -> bool {
    flag("TAPROOM_JSON")
}

pub fn is_quiet() -> bool {
    flag("TAPROOM_QUIET")
}

fn flag(name: &str) -> bool {
    std::env::var(name).map(|v| v == "1").unwrap_or(false)
}

pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}

/// Human-readable brewery listing, with each tap list when `with_taps`.
pub fn print_breweries(breweries: &[Brewery], with_taps: bool) {
    if breweries.is_empty() {
        println!("  No breweries found.");
        return;
    }
    for (i, brewery) in breweries.iter().enumerate() {
        let distance = if brewery.has_known_distance() {
            format!("{:.1} mi", brewery.distance_miles)
        } else {
            "? mi".to_string()
        };
        println!("  {:>2}. {:<36} {:>8}", i + 1, brewery.name, distance);
        if !brewery.address.is_empty() {
            println!("      {}", brewery.address);
        }
        if let Some(website) = &brewery.website {
            println!("      {website}");
        }
        if let Some(hours) = &brewery.hours {
            println!("      {hours}");
        }
        if with_taps {
            print_beers(brewery);
        }
    }
}

fn print_beers(brewery: &Brewery) {
    if brewery.beers.is_empty() {
        println!("      (no tap list)");
        return;
    }
    for beer in &brewery.beers {
        let mut line = format!("      - {}", beer.name);
        if let Some(style) = &beer.style {
            line.push_str(&format!(" | {style}"));
        }
        if let Some(abv) = beer.abv {
            line.push_str(&format!(" | {abv:.1}%"));
        }
        if let Some(ibu) = beer.ibu {
            line.push_str(&format!(" | {ibu} IBU"));
        }
        println!("{line}");
    }
}
