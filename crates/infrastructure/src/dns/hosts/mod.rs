mod parser;
mod watcher;

pub use parser::{parse_reverse_name, HostsSnapshot};
pub use watcher::HostsWatcher;

use crate::dns::metrics::ServerMetrics;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use hickory_proto::rr::RecordType;
use relay_dns_application::ports::{HostsAnswer, HostsStore};
use relay_dns_domain::{CanonicalName, RelayError};
use rustc_hash::FxBuildHasher;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use tracing::info;

/// The hosts database: an atomically replaceable snapshot plus advisory
/// round-robin counters.
///
/// Lookups take one snapshot handle and never block the watcher; the
/// watcher publishes complete snapshots only. Rotation counters live beside
/// the snapshot — they survive reloads and only influence ordering.
pub struct HostsDb {
    snapshot: ArcSwap<HostsSnapshot>,
    rotation: DashMap<CanonicalName, AtomicUsize, FxBuildHasher>,
    round_robin: bool,
    metrics: Arc<ServerMetrics>,
}

impl HostsDb {
    pub fn new(round_robin: bool, metrics: Arc<ServerMetrics>) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(HostsSnapshot::empty()),
            rotation: DashMap::with_hasher(FxBuildHasher),
            round_robin,
            metrics,
        }
    }

    /// Initial load. Unlike reloads, a missing or unreadable file here is an
    /// error: startup should not silently run with an empty database.
    pub fn from_file(
        path: impl AsRef<Path>,
        round_robin: bool,
        metrics: Arc<ServerMetrics>,
    ) -> Result<Self, RelayError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Hosts(format!("{}: {e}", path.display())))?;
        let (snapshot, skipped) = HostsSnapshot::parse(&contents);
        info!(
            path = %path.display(),
            entries = snapshot.len(),
            skipped_lines = skipped,
            "Loaded hostsfile"
        );

        let db = Self::new(round_robin, metrics);
        db.publish(snapshot);
        Ok(db)
    }

    pub fn publish(&self, snapshot: HostsSnapshot) {
        self.snapshot.store(Arc::new(snapshot));
    }

    pub fn entry_count(&self) -> usize {
        self.snapshot.load().len()
    }

    /// Rotate `addrs` left by one position per request for this name.
    fn rotated(&self, name: &CanonicalName, mut addrs: Vec<std::net::IpAddr>) -> Vec<std::net::IpAddr> {
        if !self.round_robin || addrs.len() < 2 {
            return addrs;
        }
        let counter = self
            .rotation
            .entry(name.clone())
            .or_insert_with(|| AtomicUsize::new(0));
        let offset = counter.fetch_add(1, AtomicOrdering::Relaxed) % addrs.len();
        addrs.rotate_left(offset);
        addrs
    }
}

impl HostsStore for HostsDb {
    fn lookup(&self, name: &CanonicalName, record_type: RecordType) -> HostsAnswer {
        let snapshot = self.snapshot.load();

        if record_type == RecordType::PTR {
            let Some(ip) = parse_reverse_name(name) else {
                return HostsAnswer::Miss;
            };
            return match snapshot.names_for(ip) {
                Some(names) => {
                    self.metrics
                        .hosts_hits
                        .fetch_add(1, AtomicOrdering::Relaxed);
                    HostsAnswer::Pointers(names.to_vec())
                }
                None => HostsAnswer::Miss,
            };
        }

        let Some(addrs) = snapshot.addresses(name) else {
            return HostsAnswer::Miss;
        };

        let matching: Vec<std::net::IpAddr> = match record_type {
            RecordType::A => addrs.iter().filter(|ip| ip.is_ipv4()).copied().collect(),
            RecordType::AAAA => addrs.iter().filter(|ip| ip.is_ipv6()).copied().collect(),
            // The name exists, but hosts files only carry addresses.
            _ => return HostsAnswer::NoData,
        };

        if matching.is_empty() {
            HostsAnswer::NoData
        } else {
            self.metrics
                .hosts_hits
                .fetch_add(1, AtomicOrdering::Relaxed);
            HostsAnswer::Addresses(self.rotated(name, matching))
        }
    }
}
