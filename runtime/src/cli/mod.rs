//! CLI subcommand implementations for the taproom binary.

pub mod cache_cmd;
pub mod output;
pub mod scrape_cmd;
pub mod search_cmd;
