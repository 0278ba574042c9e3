use crate::dns::cache::{Fingerprint, ResponseCache};
use crate::dns::metrics::ServerMetrics;
use async_trait::async_trait;
use dashmap::DashMap;
use hickory_proto::op::Message;
use relay_dns_application::ports::{DnsExchanger, ForwardPlan};
use relay_dns_domain::RelayError;
use rustc_hash::FxBuildHasher;
use std::sync::atomic::Ordering as AtomicOrdering;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

type Outcome = Result<Message, RelayError>;
type InflightSender = Arc<watch::Sender<Option<Outcome>>>;

/// Caching, coalescing decorator around the forwarder.
///
/// Identical concurrent misses share one upstream fetch: the first task in
/// becomes the leader, everyone else subscribes to its outcome — success or
/// failure. When the leader disappears without delivering (its client hung
/// up), the channel closes and one waiter takes over as the new leader.
///
/// With the cache disabled (capacity 0) both caching and coalescing are off
/// and every call goes straight upstream.
pub struct CachedExchanger {
    inner: Arc<dyn DnsExchanger>,
    cache: Arc<ResponseCache>,
    inflight: Arc<DashMap<Fingerprint, InflightSender, FxBuildHasher>>,
    metrics: Arc<ServerMetrics>,
}

/// Removes the in-flight entry when the leading task is dropped mid-fetch,
/// closing the channel so waiters stop waiting on a fetch nobody runs.
struct InflightGuard {
    inflight: Arc<DashMap<Fingerprint, InflightSender, FxBuildHasher>>,
    metrics: Arc<ServerMetrics>,
    key: Option<Fingerprint>,
}

impl InflightGuard {
    fn complete(mut self, outcome: &Outcome) {
        if let Some(key) = self.key.take() {
            if let Some((_, tx)) = self.inflight.remove(&key) {
                let _ = tx.send(Some(outcome.clone()));
            }
            self.metrics
                .inflight_keys
                .fetch_sub(1, AtomicOrdering::Relaxed);
        }
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.inflight.remove(&key);
            self.metrics
                .inflight_keys
                .fetch_sub(1, AtomicOrdering::Relaxed);
        }
    }
}

impl CachedExchanger {
    pub fn new(
        inner: Arc<dyn DnsExchanger>,
        cache: Arc<ResponseCache>,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        Self {
            inner,
            cache,
            inflight: Arc::new(DashMap::with_hasher(FxBuildHasher)),
            metrics,
        }
    }

    async fn lead(
        &self,
        query: &Message,
        plan: &ForwardPlan,
        fingerprint: Fingerprint,
    ) -> Outcome {
        let guard = InflightGuard {
            inflight: Arc::clone(&self.inflight),
            metrics: Arc::clone(&self.metrics),
            key: Some(fingerprint.clone()),
        };

        debug!(name = %fingerprint.name(), "Cache miss, fetching upstream");
        let result = self.inner.exchange(query, plan).await;
        if let Ok(message) = &result {
            self.cache.put(fingerprint, message);
        }
        guard.complete(&result);
        result
    }
}

#[async_trait]
impl DnsExchanger for CachedExchanger {
    async fn exchange(&self, query: &Message, plan: &ForwardPlan) -> Outcome {
        if self.cache.is_disabled() {
            return self.inner.exchange(query, plan).await;
        }
        let Some(fingerprint) = Fingerprint::of_query(query) else {
            return self.inner.exchange(query, plan).await;
        };

        // Re-entered when an in-flight leader vanishes without an outcome;
        // bounded so a pathological churn of cancellations cannot spin.
        for _ in 0..4 {
            if let Some(hit) = self.cache.get(&fingerprint, query.id()) {
                debug!(name = %fingerprint.name(), "Cache hit");
                return Ok(hit);
            }

            let mut rx = match self.inflight.entry(fingerprint.clone()) {
                dashmap::Entry::Vacant(entry) => {
                    let (tx, _rx) = watch::channel(None::<Outcome>);
                    entry.insert(Arc::new(tx));
                    self.metrics
                        .inflight_keys
                        .fetch_add(1, AtomicOrdering::Relaxed);
                    return self.lead(query, plan, fingerprint).await;
                }
                dashmap::Entry::Occupied(entry) => entry.get().subscribe(),
            };

            if rx.changed().await.is_ok() {
                if let Some(outcome) = rx.borrow().clone() {
                    return outcome.map(|mut message| {
                        message.set_id(query.id());
                        message
                    });
                }
            }
            // Channel closed without a value: the leader was cancelled.
            // Loop around — the cache may have been filled meanwhile, or we
            // become the new leader.
        }

        let result = self.inner.exchange(query, plan).await;
        if let Ok(message) = &result {
            self.cache.put(fingerprint, message);
        }
        result
    }
}
