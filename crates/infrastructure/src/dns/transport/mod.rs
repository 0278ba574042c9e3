pub mod tcp;
pub mod udp;

use async_trait::async_trait;
use relay_dns_domain::RelayError;
use std::time::Duration;

pub use tcp::{read_framed, write_framed, TcpTransport};
pub use udp::UdpTransport;

#[derive(Debug)]
pub struct TransportResponse {
    pub bytes: Vec<u8>,

    pub protocol_used: &'static str,
}

/// One send/receive round against a single upstream server.
#[async_trait]
pub trait DnsTransport: Send + Sync {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, RelayError>;

    fn protocol_name(&self) -> &'static str;
}
