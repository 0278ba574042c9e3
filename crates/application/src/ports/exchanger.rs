use async_trait::async_trait;
use hickory_proto::op::Message;
use relay_dns_domain::{Endpoint, RelayError};

/// Where a query is allowed to go, as decided by the routing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardPlan {
    /// Candidate upstreams, tried in order.
    pub endpoints: Vec<Endpoint>,

    /// True for the default upstream list; only there may the forwarder
    /// reorder endpoints based on observed timeouts.
    pub is_default: bool,
}

/// Resolves a single-question query message against a set of upstreams.
///
/// Implementations return a complete response message whose transaction ID
/// matches the query's. Exhausting every endpoint is an error; the caller
/// turns it into SERVFAIL.
#[async_trait]
pub trait DnsExchanger: Send + Sync {
    async fn exchange(&self, query: &Message, plan: &ForwardPlan) -> Result<Message, RelayError>;
}
