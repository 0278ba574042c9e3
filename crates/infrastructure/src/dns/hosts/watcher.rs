use super::parser::HostsSnapshot;
use super::HostsDb;
use crate::dns::metrics::ServerMetrics;
use std::path::PathBuf;
use std::sync::atomic::Ordering as AtomicOrdering;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Periodic hostsfile poller.
///
/// Owns the file read; publishes a fresh snapshot to the shared database
/// when the contents changed. A read failure keeps the previous snapshot,
/// increments the reload-error counter and tries again next tick.
pub struct HostsWatcher {
    db: Arc<HostsDb>,
    path: PathBuf,
    interval: Duration,
    metrics: Arc<ServerMetrics>,
}

impl HostsWatcher {
    pub fn new(
        db: Arc<HostsDb>,
        path: impl Into<PathBuf>,
        interval: Duration,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        Self {
            db,
            path: path.into(),
            interval,
            metrics,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                path = %self.path.display(),
                interval_secs = self.interval.as_secs(),
                "Watching hostsfile for changes"
            );

            let mut last_contents = tokio::fs::read_to_string(&self.path).await.ok();
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await; // the immediate first tick

            loop {
                ticker.tick().await;
                match tokio::fs::read_to_string(&self.path).await {
                    Ok(contents) => {
                        if last_contents.as_deref() == Some(contents.as_str()) {
                            continue;
                        }
                        let (snapshot, skipped) = HostsSnapshot::parse(&contents);
                        debug!(
                            path = %self.path.display(),
                            entries = snapshot.len(),
                            skipped_lines = skipped,
                            "Reloaded hostsfile"
                        );
                        self.db.publish(snapshot);
                        last_contents = Some(contents);
                    }
                    Err(e) => {
                        self.metrics
                            .hosts_reload_errors
                            .fetch_add(1, AtomicOrdering::Relaxed);
                        warn!(
                            path = %self.path.display(),
                            error = %e,
                            "Hostsfile reload failed, keeping previous snapshot"
                        );
                    }
                }
            }
        })
    }
}
