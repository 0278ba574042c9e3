use crate::dns::metrics::ServerMetrics;
use crate::dns::transport::{DnsTransport, TcpTransport, UdpTransport};
use async_trait::async_trait;
use dashmap::DashMap;
use hickory_proto::op::{Message, ResponseCode};
use relay_dns_application::ports::{DnsExchanger, ForwardPlan};
use relay_dns_domain::{Endpoint, RelayError};
use rustc_hash::FxBuildHasher;
use std::net::SocketAddr;
use std::sync::atomic::Ordering as AtomicOrdering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Walks an ordered endpoint list until one upstream produces an acceptable
/// response.
///
/// Each attempt goes out over UDP with a fresh transaction ID and falls back
/// to TCP on truncation. NOERROR and NXDOMAIN are accepted; SERVFAIL,
/// REFUSED, mismatched responses, timeouts and socket errors move on to the
/// next endpoint. Within the default upstream list an endpoint that timed
/// out is demoted behind the others until it answers again; the demotion set
/// is session-local.
pub struct Forwarder {
    read_timeout: Duration,
    demoted: DashMap<SocketAddr, (), FxBuildHasher>,
    metrics: Arc<ServerMetrics>,
}

impl Forwarder {
    pub fn new(read_timeout: Duration, metrics: Arc<ServerMetrics>) -> Self {
        Self {
            read_timeout,
            demoted: DashMap::with_hasher(FxBuildHasher),
            metrics,
        }
    }

    async fn attempt(&self, query: &Message, server: SocketAddr) -> Result<Message, RelayError> {
        let mut outbound = query.clone();
        outbound.set_id(rand::random::<u16>());
        let wire = outbound
            .to_vec()
            .map_err(|e| RelayError::Encode(e.to_string()))?;

        let udp = UdpTransport::new(server);
        let reply = udp.send(&wire, self.read_timeout).await?;
        let mut response = Message::from_vec(&reply.bytes)
            .map_err(|e| RelayError::Decode(e.to_string()))?;

        if response.truncated() {
            debug!(server = %server, "Truncated UDP response, retrying over TCP");
            let tcp = TcpTransport::new(server);
            let reply = tcp.send(&wire, self.read_timeout).await?;
            response = Message::from_vec(&reply.bytes)
                .map_err(|e| RelayError::Decode(e.to_string()))?;
        }

        validate(&outbound, &response, server)?;

        match response.response_code() {
            ResponseCode::NoError | ResponseCode::NXDomain => {
                response.set_id(query.id());
                Ok(response)
            }
            rcode => Err(RelayError::UpstreamRcode {
                server,
                rcode: rcode.to_string(),
            }),
        }
    }

    /// Demoted endpoints go last; relative order is otherwise preserved.
    fn health_ordered(&self, endpoints: &[Endpoint]) -> Vec<Endpoint> {
        let (responsive, demoted): (Vec<Endpoint>, Vec<Endpoint>) = endpoints
            .iter()
            .copied()
            .partition(|ep| !self.demoted.contains_key(&ep.addr()));
        responsive.into_iter().chain(demoted).collect()
    }
}

#[async_trait]
impl DnsExchanger for Forwarder {
    async fn exchange(&self, query: &Message, plan: &ForwardPlan) -> Result<Message, RelayError> {
        let ordered = if plan.is_default {
            self.health_ordered(&plan.endpoints)
        } else {
            plan.endpoints.clone()
        };

        for (position, endpoint) in ordered.iter().enumerate() {
            let server = endpoint.addr();
            self.metrics
                .upstream_attempts
                .fetch_add(1, AtomicOrdering::Relaxed);

            match self.attempt(query, server).await {
                Ok(response) => {
                    debug!(server = %server, position, "Upstream answered");
                    if plan.is_default {
                        self.demoted.remove(&server);
                    }
                    return Ok(response);
                }
                Err(e) => {
                    self.metrics
                        .upstream_failures
                        .fetch_add(1, AtomicOrdering::Relaxed);
                    if plan.is_default && matches!(e, RelayError::Timeout { .. }) {
                        self.demoted.insert(server, ());
                    }
                    warn!(server = %server, error = %e, position, "Failing over");
                }
            }
        }

        Err(RelayError::AllUpstreamsFailed)
    }
}

/// A response is only usable when it pairs with what we sent: same
/// transaction ID, same question.
fn validate(sent: &Message, received: &Message, server: SocketAddr) -> Result<(), RelayError> {
    if received.id() != sent.id() {
        return Err(RelayError::UpstreamMismatch { server });
    }
    let question = match sent.queries().first() {
        Some(q) => q,
        None => return Ok(()),
    };
    match received.queries().first() {
        Some(echoed)
            if echoed.name() == question.name()
                && echoed.query_type() == question.query_type()
                && echoed.query_class() == question.query_class() =>
        {
            Ok(())
        }
        _ => Err(RelayError::UpstreamMismatch { server }),
    }
}
