#![allow(dead_code)]

use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};

/// How a fake upstream responds to every query it receives.
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// NOERROR with one address record, after an optional delay.
    Answer { ip: IpAddr, delay: Duration },
    NxDomain,
    NoData,
    ServFail,
    Refused,
    /// Reply with a wrong transaction ID.
    BadId,
    /// Never reply; the client runs into its read timeout.
    Ignore,
    /// UDP replies carry only the TC bit; the full answer is served over
    /// TCP on the same port.
    TruncateUdp { ip: IpAddr },
}

/// A scripted upstream DNS server on a loopback port, serving UDP and TCP.
pub struct FakeUpstream {
    pub addr: SocketAddr,
    queries: Arc<AtomicUsize>,
}

impl FakeUpstream {
    pub async fn spawn(behaviour: Behaviour) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let listener = TcpListener::bind(addr).await.unwrap();
        let queries = Arc::new(AtomicUsize::new(0));

        let udp_behaviour = behaviour.clone();
        let udp_queries = Arc::clone(&queries);
        tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            loop {
                let Ok((n, from)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                udp_queries.fetch_add(1, Ordering::SeqCst);
                if let Some(reply) = render(&buf[..n], &udp_behaviour, true).await {
                    let _ = socket.send_to(&reply, from).await;
                }
            }
        });

        let tcp_behaviour = behaviour;
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let behaviour = tcp_behaviour.clone();
                tokio::spawn(async move {
                    use tokio::io::{AsyncReadExt, AsyncWriteExt};
                    let mut len_buf = [0u8; 2];
                    while stream.read_exact(&mut len_buf).await.is_ok() {
                        let len = u16::from_be_bytes(len_buf) as usize;
                        let mut body = vec![0u8; len];
                        if stream.read_exact(&mut body).await.is_err() {
                            return;
                        }
                        if let Some(reply) = render(&body, &behaviour, false).await {
                            let frame_len = (reply.len() as u16).to_be_bytes();
                            if stream.write_all(&frame_len).await.is_err()
                                || stream.write_all(&reply).await.is_err()
                            {
                                return;
                            }
                        }
                    }
                });
            }
        });

        Self { addr, queries }
    }

    /// UDP queries seen so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

async fn render(query_bytes: &[u8], behaviour: &Behaviour, udp: bool) -> Option<Vec<u8>> {
    let query = Message::from_vec(query_bytes).ok()?;
    let question = query.queries().first()?.clone();

    let mut response = Message::new();
    response.set_id(query.id());
    response.set_message_type(MessageType::Response);
    response.set_op_code(OpCode::Query);
    response.set_recursion_desired(query.recursion_desired());
    response.set_recursion_available(true);
    response.add_query(question.clone());

    match behaviour {
        Behaviour::Answer { ip, delay } => {
            if !delay.is_zero() {
                tokio::time::sleep(*delay).await;
            }
            response.add_answer(answer_record(&question, *ip));
        }
        Behaviour::NxDomain => {
            response.set_response_code(ResponseCode::NXDomain);
        }
        Behaviour::NoData => {}
        Behaviour::ServFail => {
            response.set_response_code(ResponseCode::ServFail);
        }
        Behaviour::Refused => {
            response.set_response_code(ResponseCode::Refused);
        }
        Behaviour::BadId => {
            response.set_id(query.id().wrapping_add(1));
            response.add_answer(answer_record(&question, "192.0.2.99".parse().unwrap()));
        }
        Behaviour::Ignore => return None,
        Behaviour::TruncateUdp { ip } => {
            if udp {
                response.set_truncated(true);
            } else {
                response.add_answer(answer_record(&question, *ip));
            }
        }
    }

    response.to_vec().ok()
}

fn answer_record(question: &Query, ip: IpAddr) -> Record {
    let rdata = match ip {
        IpAddr::V4(v4) => RData::A(A(v4)),
        IpAddr::V6(v6) => RData::AAAA(AAAA(v6)),
    };
    Record::from_rdata(question.name().clone(), 300, rdata)
}

/// A plain recursion-desired query with EDNS, as a stub resolver would send.
pub fn make_query(name: &str, record_type: RecordType) -> Message {
    let mut message = Message::new();
    message.set_id(rand_id());
    message.set_message_type(MessageType::Query);
    message.set_op_code(OpCode::Query);
    message.set_recursion_desired(true);
    message.add_query(Query::query(Name::from_str(name).unwrap(), record_type));

    let mut edns = Edns::new();
    edns.set_max_payload(4096);
    edns.set_version(0);
    message.set_edns(edns);
    message
}

fn rand_id() -> u16 {
    rand::random()
}
