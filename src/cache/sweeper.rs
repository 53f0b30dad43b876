//! Periodic retention sweep for the result cache

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, instrument};

use super::ResultCache;

pub struct CacheSweeper {
    cache: Arc<ResultCache>,
    sweep_interval: Duration,
}

impl CacheSweeper {
    pub fn new(cache: Arc<ResultCache>, sweep_interval: Duration) -> Self {
        Self {
            cache,
            sweep_interval,
        }
    }

    /// Sweep on every tick until a shutdown signal arrives. The first sweep
    /// runs immediately.
    #[instrument(skip_all)]
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!("🧹 Cache sweeper starting, interval {:?}", self.sweep_interval);

        let mut timer = interval(self.sweep_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    let removed = self.cache.sweep();
                    let stats = self.cache.stats();
                    debug!(
                        "Sweep removed {} entries; {} live, {} hits, {} misses",
                        removed, stats.live_entries, stats.hits, stats.misses
                    );
                }
                _ = shutdown.recv() => {
                    info!("🛑 Cache sweeper shutting down");
                    break;
                }
            }
        }
    }
}
