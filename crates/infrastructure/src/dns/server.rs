use crate::dns::metrics::ServerMetrics;
use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use relay_dns_application::ResolveQueryUseCase;
use std::sync::atomic::Ordering as AtomicOrdering;
use std::sync::Arc;
use tracing::{debug, warn};

const HEADER_LEN: usize = 12;

/// Maximum UDP payload we are willing to advertise or honour.
const MAX_UDP_PAYLOAD: usize = 4096;

/// Minimum UDP payload every DNS client must accept (RFC 1035).
const MIN_UDP_PAYLOAD: usize = 512;

/// Wire-level dispatcher: decodes inbound messages, applies the message
/// sanity checks, runs the resolution pipeline, and encodes exactly one
/// response — truncated for UDP clients whose buffer it would overflow.
pub struct DnsServerHandler {
    use_case: Arc<ResolveQueryUseCase>,
    metrics: Arc<ServerMetrics>,
}

impl DnsServerHandler {
    pub fn new(use_case: Arc<ResolveQueryUseCase>, metrics: Arc<ServerMetrics>) -> Self {
        Self { use_case, metrics }
    }

    pub fn metrics(&self) -> Arc<ServerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Handle one UDP datagram. `None` means drop silently.
    pub async fn handle_udp(&self, bytes: &[u8]) -> Option<Vec<u8>> {
        self.handle(bytes, true).await
    }

    /// Handle one message read from a TCP stream (length prefix already
    /// stripped). TCP responses are never truncated.
    pub async fn handle_tcp(&self, bytes: &[u8]) -> Option<Vec<u8>> {
        self.handle(bytes, false).await
    }

    async fn handle(&self, bytes: &[u8], udp: bool) -> Option<Vec<u8>> {
        self.metrics
            .queries_received
            .fetch_add(1, AtomicOrdering::Relaxed);

        if bytes.len() < HEADER_LEN {
            debug!(len = bytes.len(), "Dropping short datagram");
            return None;
        }

        let request = match Message::from_vec(bytes) {
            Ok(message) => message,
            Err(e) => {
                // The header was readable, so a FORMERR with the client's
                // transaction ID is still possible.
                debug!(error = %e, "Undecodable message, replying FORMERR");
                let id = u16::from_be_bytes([bytes[0], bytes[1]]);
                return encode(&formerr(id));
            }
        };

        if request.message_type() != MessageType::Query {
            return None;
        }

        let response = if request.op_code() != OpCode::Query || request.queries().len() != 1 {
            debug!(
                op_code = ?request.op_code(),
                questions = request.queries().len(),
                "Unsupported query shape, replying NOTIMP"
            );
            not_implemented(&request)
        } else {
            self.use_case.execute(&request).await
        };

        match response.response_code() {
            ResponseCode::ServFail => {
                self.metrics
                    .servfail_returned
                    .fetch_add(1, AtomicOrdering::Relaxed);
            }
            ResponseCode::NXDomain => {
                self.metrics
                    .nxdomain_returned
                    .fetch_add(1, AtomicOrdering::Relaxed);
            }
            _ => {}
        }

        let wire = encode(&response)?;
        if udp {
            let limit = request
                .extensions()
                .as_ref()
                .map(|edns| (edns.max_payload() as usize).clamp(MIN_UDP_PAYLOAD, MAX_UDP_PAYLOAD))
                .unwrap_or(MIN_UDP_PAYLOAD);
            if wire.len() > limit {
                debug!(
                    len = wire.len(),
                    limit, "Response exceeds client buffer, truncating"
                );
                return encode(&truncated(&response));
            }
        }
        Some(wire)
    }
}

fn encode(message: &Message) -> Option<Vec<u8>> {
    match message.to_vec() {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!(error = %e, "Failed to encode response");
            None
        }
    }
}

fn formerr(id: u16) -> Message {
    let mut response = Message::new();
    response.set_id(id);
    response.set_message_type(MessageType::Response);
    response.set_op_code(OpCode::Query);
    response.set_response_code(ResponseCode::FormErr);
    response
}

fn not_implemented(request: &Message) -> Message {
    let mut response = Message::new();
    response.set_id(request.id());
    response.set_message_type(MessageType::Response);
    response.set_op_code(request.op_code());
    response.set_recursion_desired(request.recursion_desired());
    response.set_response_code(ResponseCode::NotImp);
    response.add_queries(request.queries().to_vec());
    response
}

/// The TC-bit reply sent when a UDP response overflows the client's buffer:
/// header and question only, prompting a TCP retry.
fn truncated(response: &Message) -> Message {
    let mut short = Message::new();
    short.set_id(response.id());
    short.set_message_type(MessageType::Response);
    short.set_op_code(OpCode::Query);
    short.set_response_code(response.response_code());
    short.set_recursion_desired(response.recursion_desired());
    short.set_recursion_available(response.recursion_available());
    short.set_truncated(true);
    short.add_queries(response.queries().to_vec());
    if let Some(edns) = response.extensions().clone() {
        short.set_edns(edns);
    }
    short
}
