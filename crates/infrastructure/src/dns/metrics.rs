use std::sync::atomic::{AtomicI64, AtomicU64, Ordering as AtomicOrdering};

/// Observable counters of the resolver core. One instance per server,
/// shared by the dispatcher, hosts database, cache and forwarder. Counters
/// are advisory; `Relaxed` ordering is enough.
#[derive(Default)]
pub struct ServerMetrics {
    pub queries_received: AtomicU64,
    pub hosts_hits: AtomicU64,
    pub hosts_reload_errors: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_inserts: AtomicU64,
    pub cache_evictions: AtomicU64,
    pub upstream_attempts: AtomicU64,
    pub upstream_failures: AtomicU64,
    pub servfail_returned: AtomicU64,
    pub nxdomain_returned: AtomicU64,
    pub inflight_keys: AtomicI64,
}

/// A plain copy of every counter, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queries_received: u64,
    pub hosts_hits: u64,
    pub hosts_reload_errors: u64,
    pub cache_hits: u64,
    pub cache_inserts: u64,
    pub cache_evictions: u64,
    pub upstream_attempts: u64,
    pub upstream_failures: u64,
    pub servfail_returned: u64,
    pub nxdomain_returned: u64,
    pub inflight_keys: i64,
}

impl ServerMetrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_received: self.queries_received.load(AtomicOrdering::Relaxed),
            hosts_hits: self.hosts_hits.load(AtomicOrdering::Relaxed),
            hosts_reload_errors: self.hosts_reload_errors.load(AtomicOrdering::Relaxed),
            cache_hits: self.cache_hits.load(AtomicOrdering::Relaxed),
            cache_inserts: self.cache_inserts.load(AtomicOrdering::Relaxed),
            cache_evictions: self.cache_evictions.load(AtomicOrdering::Relaxed),
            upstream_attempts: self.upstream_attempts.load(AtomicOrdering::Relaxed),
            upstream_failures: self.upstream_failures.load(AtomicOrdering::Relaxed),
            servfail_returned: self.servfail_returned.load(AtomicOrdering::Relaxed),
            nxdomain_returned: self.nxdomain_returned.load(AtomicOrdering::Relaxed),
            inflight_keys: self.inflight_keys.load(AtomicOrdering::Relaxed),
        }
    }
}
