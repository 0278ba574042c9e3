use super::key::Fingerprint;
use crate::dns::metrics::ServerMetrics;
use dashmap::DashMap;
use hickory_proto::op::{Message, ResponseCode};
use rustc_hash::FxBuildHasher;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

struct CachedResponse {
    /// Stored with transaction ID 0; stamped with the caller's ID on read.
    message: Message,
    inserted_seq: u64,
    expires_at: Instant,
}

/// Bounded response cache keyed by query fingerprint.
///
/// Entries live for exactly the configured TTL, whatever the record TTLs
/// say. At capacity the oldest-inserted entry is evicted (FIFO). Capacity 0
/// disables the cache entirely.
///
/// The insertion-order queue carries (sequence, key) pairs; an entry is only
/// evicted when its stored sequence still matches, so overwriting a key
/// leaves a stale queue slot that is skipped instead of evicting the
/// fresh entry.
pub struct ResponseCache {
    entries: DashMap<Fingerprint, CachedResponse, FxBuildHasher>,
    order: Mutex<VecDeque<(u64, Fingerprint)>>,
    seq: AtomicU64,
    capacity: usize,
    ttl: Duration,
    metrics: Arc<ServerMetrics>,
}

impl ResponseCache {
    pub fn new(capacity: usize, ttl: Duration, metrics: Arc<ServerMetrics>) -> Self {
        Self {
            entries: DashMap::with_hasher(FxBuildHasher),
            order: Mutex::new(VecDeque::new()),
            seq: AtomicU64::new(0),
            capacity,
            ttl,
            metrics,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.capacity == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, fingerprint: &Fingerprint, client_id: u16) -> Option<Message> {
        self.get_at(fingerprint, client_id, Instant::now())
    }

    /// Look up a fingerprint as of `now`. A hit returns a copy of the stored
    /// message with `client_id` stamped in; an expired entry is removed on
    /// the way out.
    pub fn get_at(
        &self,
        fingerprint: &Fingerprint,
        client_id: u16,
        now: Instant,
    ) -> Option<Message> {
        if self.is_disabled() {
            return None;
        }

        let expired = match self.entries.get(fingerprint) {
            Some(entry) => {
                if now < entry.expires_at {
                    let mut message = entry.message.clone();
                    message.set_id(client_id);
                    self.metrics
                        .cache_hits
                        .fetch_add(1, AtomicOrdering::Relaxed);
                    return Some(message);
                }
                true
            }
            None => false,
        };

        if expired {
            self.entries.remove(fingerprint);
        }
        None
    }

    pub fn put(&self, fingerprint: Fingerprint, message: &Message) {
        self.put_at(fingerprint, message, Instant::now());
    }

    /// Insert a response as of `now`. Responses that signal a server-side
    /// problem (SERVFAIL, REFUSED, NOTIMP) are never stored; NXDOMAIN and
    /// NOERROR, empty answers included, are stored for the full TTL.
    pub fn put_at(&self, fingerprint: Fingerprint, message: &Message, now: Instant) {
        if self.is_disabled() {
            return;
        }
        if !cacheable(message.response_code()) {
            return;
        }

        let mut stored = message.clone();
        stored.set_id(0);

        let seq = self.seq.fetch_add(1, AtomicOrdering::Relaxed);
        self.entries.insert(
            fingerprint.clone(),
            CachedResponse {
                message: stored,
                inserted_seq: seq,
                expires_at: now + self.ttl,
            },
        );
        self.metrics
            .cache_inserts
            .fetch_add(1, AtomicOrdering::Relaxed);
        debug!(name = %fingerprint.name(), "Cached response");

        let mut order = self.order.lock().unwrap();
        order.push_back((seq, fingerprint));
        while self.entries.len() > self.capacity {
            let Some((old_seq, old_key)) = order.pop_front() else {
                break;
            };
            let live = self
                .entries
                .get(&old_key)
                .map(|e| e.inserted_seq == old_seq)
                .unwrap_or(false);
            if live {
                self.entries.remove(&old_key);
                self.metrics
                    .cache_evictions
                    .fetch_add(1, AtomicOrdering::Relaxed);
                debug!(name = %old_key.name(), "Evicted oldest cache entry");
            }
        }
    }
}

fn cacheable(rcode: ResponseCode) -> bool {
    matches!(rcode, ResponseCode::NoError | ResponseCode::NXDomain)
}
