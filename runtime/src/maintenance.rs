//! Background cache maintenance loop.
//!
//! Purges expired searches and stale brewery details on a fixed cadence until
//! shutdown is signaled.

use crate::cache::BreweryCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

const DEFAULT_TICK_SECS: u64 = 3600;

/// Tick interval from `TAPROOM_MAINTENANCE_TICK_SECS`, at least one second.
pub fn tick_from_env() -> Duration {
    let secs = std::env::var("TAPROOM_MAINTENANCE_TICK_SECS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_TICK_SECS)
        .max(1);
    Duration::from_secs(secs)
}

/// Spawn the maintenance loop. The first cleanup runs immediately.
pub fn spawn(
    cache: Arc<BreweryCache>,
    every: Duration,
    shutdown: Arc<Notify>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(tick_secs = every.as_secs(), "maintenance loop started");
        let mut ticker = tokio::time::interval(every);
        let mut tick_count: u64 = 0;

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    tracing::info!(ticks = tick_count, "maintenance loop stopping");
                    break;
                }
                _ = ticker.tick() => {
                    tick_count = tick_count.saturating_add(1);
                    run_cleanup(&cache);
                }
            }
        }
    })
}

fn run_cleanup(cache: &BreweryCache) {
    match cache.cleanup_expired() {
        Ok(report) if report.total() > 0 => tracing::info!(
            searches_removed = report.searches_removed,
            details_removed = report.details_removed,
            "maintenance cache cleanup removed expired entries"
        ),
        Ok(_) => tracing::debug!("maintenance cache cleanup found nothing to remove"),
        Err(e) => tracing::warn!(error = %e, "maintenance cache cleanup failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::SqliteStore;
    use crate::cache::{Clock, ManualClock};
    use crate::config::PipelineConfig;
    use crate::model::Brewery;

    #[tokio::test]
    async fn test_loop_cleans_up_and_stops_on_shutdown() {
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let cache = Arc::new(BreweryCache::new(
            Arc::new(SqliteStore::open_in_memory().unwrap()),
            clock.clone(),
            &PipelineConfig::default(),
        ));
        cache.put_search("94556", 15, &[Brewery::new("Hop Valley Brewing", "")]);
        clock.set(clock.now() + chrono::Duration::hours(25));
        assert_eq!(cache.stats().unwrap().search_entries_total, 1);

        let shutdown = Arc::new(Notify::new());
        let handle = spawn(cache.clone(), Duration::from_millis(20), shutdown.clone());

        let mut cleaned = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if cache.stats().unwrap().search_entries_total == 0 {
                cleaned = true;
                break;
            }
        }
        assert!(cleaned);

        shutdown.notify_one();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("maintenance loop should stop")
            .unwrap();
    }

    #[test]
    fn test_tick_from_env_has_floor() {
        assert!(tick_from_env() >= Duration::from_secs(1));
    }
}
