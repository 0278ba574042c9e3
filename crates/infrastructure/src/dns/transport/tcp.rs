//! TCP transport: two-byte big-endian length prefix before each message
//! (RFC 1035 §4.2.2). Used when a UDP response comes back truncated.

use super::{DnsTransport, TransportResponse};
use async_trait::async_trait;
use relay_dns_domain::RelayError;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

pub struct TcpTransport {
    server_addr: SocketAddr,
}

impl TcpTransport {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self { server_addr }
    }

    fn io_error(&self, detail: impl ToString) -> RelayError {
        RelayError::Io {
            server: self.server_addr,
            detail: detail.to_string(),
        }
    }

    fn timeout_error(&self) -> RelayError {
        RelayError::Timeout {
            server: self.server_addr,
        }
    }
}

#[async_trait]
impl DnsTransport for TcpTransport {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, RelayError> {
        let mut stream = tokio::time::timeout(timeout, TcpStream::connect(self.server_addr))
            .await
            .map_err(|_| self.timeout_error())?
            .map_err(|e| self.io_error(e))?;

        tokio::time::timeout(timeout, write_framed(&mut stream, message_bytes))
            .await
            .map_err(|_| self.timeout_error())?
            .map_err(|e| self.io_error(e))?;

        debug!(server = %self.server_addr, message_len = message_bytes.len(), "TCP query sent");

        let response_bytes = tokio::time::timeout(timeout, read_framed(&mut stream))
            .await
            .map_err(|_| self.timeout_error())?
            .map_err(|e| self.io_error(e))?;

        debug!(server = %self.server_addr, response_len = response_bytes.len(), "TCP response received");

        Ok(TransportResponse {
            bytes: response_bytes,
            protocol_used: "TCP",
        })
    }

    fn protocol_name(&self) -> &'static str {
        "TCP"
    }
}

/// Write one length-prefixed DNS message. Shared with the listening side.
pub async fn write_framed<S>(stream: &mut S, message_bytes: &[u8]) -> std::io::Result<()>
where
    S: AsyncWriteExt + Unpin,
{
    let length = message_bytes.len() as u16;
    stream.write_all(&length.to_be_bytes()).await?;
    stream.write_all(message_bytes).await?;
    stream.flush().await
}

/// Read one length-prefixed DNS message. Shared with the listening side.
pub async fn read_framed<S>(stream: &mut S) -> std::io::Result<Vec<u8>>
where
    S: AsyncReadExt + Unpin,
{
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;

    let response_len = u16::from_be_bytes(len_buf) as usize;
    let mut response = vec![0u8; response_len];
    stream.read_exact(&mut response).await?;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn framed_roundtrip() {
        let mut buf = std::io::Cursor::new(Vec::new());
        write_framed(&mut buf, b"\x12\x34hello").await.unwrap();
        assert_eq!(&buf.get_ref()[..2], &[0, 7]);

        buf.set_position(0);
        let body = read_framed(&mut buf).await.unwrap();
        assert_eq!(body, b"\x12\x34hello");
    }
}
