//! UDP transport for upstream queries (RFC 1035 §4.2.1)
//!
//! Messages are sent as-is, no framing. Responses are read into a 4096-byte
//! buffer (EDNS(0) ceiling). A response with the TC bit set tells the caller
//! to retry the same server over TCP.

use super::{DnsTransport, TransportResponse};
use async_trait::async_trait;
use relay_dns_domain::RelayError;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Maximum UDP DNS response size with EDNS(0)
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

pub struct UdpTransport {
    server_addr: SocketAddr,
}

impl UdpTransport {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self { server_addr }
    }

    fn io_error(&self, detail: impl ToString) -> RelayError {
        RelayError::Io {
            server: self.server_addr,
            detail: detail.to_string(),
        }
    }
}

#[async_trait]
impl DnsTransport for UdpTransport {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, RelayError> {
        let bind_addr: SocketAddr = if self.server_addr.is_ipv4() {
            "0.0.0.0:0".parse().unwrap()
        } else {
            "[::]:0".parse().unwrap()
        };

        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| self.io_error(e))?;
        socket
            .connect(self.server_addr)
            .await
            .map_err(|e| self.io_error(e))?;
        socket
            .send(message_bytes)
            .await
            .map_err(|e| self.io_error(e))?;

        debug!(server = %self.server_addr, bytes_sent = message_bytes.len(), "UDP query sent");

        let mut recv_buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
        let bytes_received = tokio::time::timeout(timeout, socket.recv(&mut recv_buf))
            .await
            .map_err(|_| RelayError::Timeout {
                server: self.server_addr,
            })?
            .map_err(|e| self.io_error(e))?;

        if bytes_received < 12 {
            warn!(server = %self.server_addr, bytes_received, "UDP response shorter than a DNS header");
            return Err(self.io_error("short response"));
        }
        recv_buf.truncate(bytes_received);

        debug!(server = %self.server_addr, bytes_received, "UDP response received");

        Ok(TransportResponse {
            bytes: recv_buf,
            protocol_used: "UDP",
        })
    }

    fn protocol_name(&self) -> &'static str {
        "UDP"
    }
}
