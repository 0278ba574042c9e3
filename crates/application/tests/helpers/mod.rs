use async_trait::async_trait;
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use relay_dns_application::ports::{DnsExchanger, ForwardPlan, HostsAnswer, HostsStore};
use relay_dns_domain::{CanonicalName, RelayError};
use std::collections::HashMap;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Mutex;

/// What the fake upstream does for one candidate name.
#[derive(Debug, Clone)]
pub enum Scripted {
    Answer(IpAddr),
    NxDomain,
    NoData,
    Fail,
}

/// Records every exchange and replies from a per-name script.
pub struct MockExchanger {
    script: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<(String, ForwardPlan)>>,
}

impl MockExchanger {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn script(&self, name: &str, behaviour: Scripted) {
        self.script
            .lock()
            .unwrap()
            .insert(name.to_string(), behaviour);
    }

    pub fn queried_names(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn plans(&self) -> Vec<ForwardPlan> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, plan)| plan.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DnsExchanger for MockExchanger {
    async fn exchange(&self, query: &Message, plan: &ForwardPlan) -> Result<Message, RelayError> {
        let question = query.queries()[0].clone();
        let qname = question.name().to_utf8().to_ascii_lowercase();
        self.calls
            .lock()
            .unwrap()
            .push((qname.clone(), plan.clone()));

        let behaviour = self
            .script
            .lock()
            .unwrap()
            .get(&qname)
            .cloned()
            .unwrap_or(Scripted::NxDomain);

        let mut response = Message::new();
        response.set_id(query.id());
        response.set_message_type(MessageType::Response);
        response.set_op_code(OpCode::Query);
        response.set_recursion_desired(true);
        response.set_recursion_available(true);
        response.add_query(question.clone());

        match behaviour {
            Scripted::Answer(ip) => {
                let rdata = match ip {
                    IpAddr::V4(v4) => RData::A(A(v4)),
                    IpAddr::V6(v6) => RData::AAAA(AAAA(v6)),
                };
                response.add_answer(Record::from_rdata(question.name().clone(), 60, rdata));
            }
            Scripted::NxDomain => {
                response.set_response_code(ResponseCode::NXDomain);
            }
            Scripted::NoData => {}
            Scripted::Fail => return Err(RelayError::AllUpstreamsFailed),
        }
        Ok(response)
    }
}

/// In-memory hosts database with the lookup semantics of the real one.
pub struct MockHostsStore {
    addresses: HashMap<String, Vec<IpAddr>>,
    pointers: HashMap<String, Vec<CanonicalName>>,
}

impl MockHostsStore {
    pub fn new() -> Self {
        Self {
            addresses: HashMap::new(),
            pointers: HashMap::new(),
        }
    }

    pub fn with_address(mut self, name: &str, ip: &str) -> Self {
        self.addresses
            .entry(format!("{}.", name.trim_end_matches('.')))
            .or_default()
            .push(ip.parse().unwrap());
        self
    }

    pub fn with_pointer(mut self, reverse_name: &str, target: &str) -> Self {
        self.pointers
            .entry(format!("{}.", reverse_name.trim_end_matches('.')))
            .or_default()
            .push(CanonicalName::from_user(target).unwrap());
        self
    }
}

impl HostsStore for MockHostsStore {
    fn lookup(&self, name: &CanonicalName, record_type: RecordType) -> HostsAnswer {
        if record_type == RecordType::PTR {
            return match self.pointers.get(name.as_str()) {
                Some(names) => HostsAnswer::Pointers(names.clone()),
                None => HostsAnswer::Miss,
            };
        }

        match self.addresses.get(name.as_str()) {
            Some(addrs) => {
                let matching: Vec<IpAddr> = addrs
                    .iter()
                    .filter(|ip| match record_type {
                        RecordType::A => ip.is_ipv4(),
                        RecordType::AAAA => ip.is_ipv6(),
                        _ => false,
                    })
                    .copied()
                    .collect();
                if matching.is_empty() {
                    HostsAnswer::NoData
                } else {
                    HostsAnswer::Addresses(matching)
                }
            }
            None => HostsAnswer::Miss,
        }
    }
}

pub fn make_query(name: &str, record_type: RecordType, recursion_desired: bool) -> Message {
    let mut message = Message::new();
    message.set_id(0x2b1c);
    message.set_message_type(MessageType::Query);
    message.set_op_code(OpCode::Query);
    message.set_recursion_desired(recursion_desired);
    message.add_query(Query::query(Name::from_str(name).unwrap(), record_type));

    let mut edns = Edns::new();
    edns.set_max_payload(4096);
    edns.set_version(0);
    message.set_edns(edns);
    message
}
