use crate::ports::{DnsExchanger, HostsAnswer, HostsStore};
use crate::services::{RouteDecision, Router, SearchList};
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA, PTR};
use hickory_proto::rr::{Name, RData, Record};
use relay_dns_domain::{CanonicalName, RelayError};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// The query-resolution pipeline.
///
/// For one decoded client message this produces exactly one response:
/// hosts database first, then the search-domain candidate walk, each
/// candidate routed (alias / stub zone / default) and resolved through the
/// exchanger. The response carries the client's transaction ID and its
/// original question section, whatever name was actually resolved.
pub struct ResolveQueryUseCase {
    hosts: Arc<dyn HostsStore>,
    exchanger: Arc<dyn DnsExchanger>,
    router: Router,
    search: SearchList,
    no_rec: bool,
    fwd_ndots: usize,
    hosts_ttl: u32,
}

impl ResolveQueryUseCase {
    pub fn new(
        hosts: Arc<dyn HostsStore>,
        exchanger: Arc<dyn DnsExchanger>,
        router: Router,
        search: SearchList,
        no_rec: bool,
        fwd_ndots: usize,
        hosts_ttl: u32,
    ) -> Self {
        Self {
            hosts,
            exchanger,
            router,
            search,
            no_rec,
            fwd_ndots,
            hosts_ttl,
        }
    }

    /// Resolve a single-question query message. Never fails: policy and
    /// upstream errors become response codes.
    pub async fn execute(&self, request: &Message) -> Message {
        let query = match request.queries().first() {
            Some(q) => q.clone(),
            None => return self.base_response(request, ResponseCode::FormErr),
        };

        let qname = match CanonicalName::from_user(&query.name().to_utf8()) {
            Ok(name) => name,
            Err(_) => return self.base_response(request, ResponseCode::FormErr),
        };
        let record_type = query.query_type();
        let rd = request.recursion_desired();

        let mut nxdomain: Option<Message> = None;
        let mut nodata: Option<Message> = None;
        let mut refused = false;
        let mut gated = false;

        for candidate in self.search.candidates(&qname) {
            let target = self.router.route(&candidate, record_type, self.hosts.as_ref());
            match target.decision {
                RouteDecision::Hosts(answer) => {
                    debug!(domain = %target.name, record_type = %record_type, "Hosts answer");
                    return self.hosts_response(request, answer);
                }
                RouteDecision::Refuse => {
                    refused = true;
                }
                RouteDecision::Forward(plan) => {
                    // Forwarding acts on the client's behalf: it needs the
                    // client to ask for recursion and recursion to be on.
                    if !rd || self.no_rec {
                        refused = true;
                        continue;
                    }
                    if target.name.label_count() < self.fwd_ndots {
                        debug!(domain = %target.name, fwd_ndots = self.fwd_ndots, "Below forwarding threshold");
                        gated = true;
                        continue;
                    }

                    let upstream_query = match self.candidate_query(request, &target.name) {
                        Ok(msg) => msg,
                        Err(e) => {
                            warn!(domain = %target.name, error = %e, "Skipping unencodable candidate");
                            continue;
                        }
                    };

                    match self.exchanger.exchange(&upstream_query, &plan).await {
                        Ok(response) => match response.response_code() {
                            ResponseCode::NoError if !response.answers().is_empty() => {
                                return self.finalize(response, request, &target.name);
                            }
                            ResponseCode::NoError => {
                                if nodata.is_none() {
                                    nodata = Some(self.finalize(response, request, &target.name));
                                }
                            }
                            ResponseCode::NXDomain => {
                                if nxdomain.is_none() {
                                    nxdomain = Some(self.finalize(response, request, &target.name));
                                }
                            }
                            other => {
                                debug!(domain = %target.name, rcode = %other, "Ignoring candidate rcode");
                            }
                        },
                        Err(e) => {
                            warn!(domain = %target.name, error = %e, "Candidate resolution failed");
                        }
                    }
                }
            }
        }

        // No candidate produced a positive answer. NXDOMAIN wins over
        // NODATA, NODATA over policy refusal, SERVFAIL is the last resort.
        if let Some(response) = nxdomain {
            return response;
        }
        if gated {
            return self.base_response(request, ResponseCode::NXDomain);
        }
        if let Some(response) = nodata {
            return response;
        }
        if refused {
            return self.base_response(request, ResponseCode::Refused);
        }
        self.base_response(request, ResponseCode::ServFail)
    }

    fn base_response(&self, request: &Message, rcode: ResponseCode) -> Message {
        let mut response = Message::new();
        response.set_id(request.id());
        response.set_message_type(MessageType::Response);
        response.set_op_code(OpCode::Query);
        response.set_recursion_desired(request.recursion_desired());
        response.set_recursion_available(!self.no_rec);
        response.set_response_code(rcode);
        response.add_queries(request.queries().to_vec());
        response
    }

    /// Build a NOERROR response straight from the hosts database. Answers
    /// carry the client-visible question name even when a search-domain or
    /// alias substitution located the entry.
    fn hosts_response(&self, request: &Message, answer: HostsAnswer) -> Message {
        let mut response = self.base_response(request, ResponseCode::NoError);
        let qname = match request.queries().first() {
            Some(q) => q.name().clone(),
            None => return response,
        };

        match answer {
            HostsAnswer::Addresses(addrs) => {
                for ip in addrs {
                    let rdata = match ip {
                        IpAddr::V4(v4) => RData::A(A(v4)),
                        IpAddr::V6(v6) => RData::AAAA(AAAA(v6)),
                    };
                    response.add_answer(Record::from_rdata(qname.clone(), self.hosts_ttl, rdata));
                }
            }
            HostsAnswer::Pointers(names) => {
                for name in names {
                    match Name::from_utf8(name.as_str()) {
                        Ok(ptr) => {
                            response.add_answer(Record::from_rdata(
                                qname.clone(),
                                self.hosts_ttl,
                                RData::PTR(PTR(ptr)),
                            ));
                        }
                        Err(e) => warn!(name = %name, error = %e, "Unencodable PTR target"),
                    }
                }
            }
            HostsAnswer::NoData | HostsAnswer::Miss => {}
        }
        response
    }

    /// The message actually sent upstream: the candidate name with the
    /// client's question type and class, client EDNS mirrored so the DO bit
    /// keeps validating and non-validating clients apart in the cache.
    fn candidate_query(
        &self,
        request: &Message,
        name: &CanonicalName,
    ) -> Result<Message, RelayError> {
        let qname =
            Name::from_utf8(name.as_str()).map_err(|e| RelayError::InvalidName(e.to_string()))?;
        let original = &request.queries()[0];
        let mut query = Query::query(qname, original.query_type());
        query.set_query_class(original.query_class());

        let mut message = Message::new();
        message.set_id(request.id());
        message.set_message_type(MessageType::Query);
        message.set_op_code(OpCode::Query);
        message.set_recursion_desired(true);
        message.add_query(query);

        if let Some(client_edns) = request.extensions() {
            let mut edns = Edns::new();
            edns.set_max_payload(client_edns.max_payload().max(512));
            edns.set_version(0);
            edns.set_dnssec_ok(client_edns.dnssec_ok());
            message.set_edns(edns);
        }
        Ok(message)
    }

    /// Adapt an upstream response for the client: its transaction ID, its
    /// question section, and owner names rewritten back where the resolved
    /// name was substituted.
    fn finalize(
        &self,
        response: Message,
        request: &Message,
        resolved_name: &CanonicalName,
    ) -> Message {
        let original = &request.queries()[0];
        let resolved = Name::from_utf8(resolved_name.as_str()).ok();
        let rename = resolved
            .as_ref()
            .filter(|r| *r != original.name())
            .is_some();

        let mut out = Message::new();
        out.set_id(request.id());
        out.set_message_type(MessageType::Response);
        out.set_op_code(OpCode::Query);
        out.set_response_code(response.response_code());
        out.set_authoritative(response.authoritative());
        out.set_truncated(response.truncated());
        out.set_recursion_desired(request.recursion_desired());
        out.set_recursion_available(!self.no_rec);
        out.add_queries(request.queries().to_vec());

        let answers = response
            .answers()
            .iter()
            .map(|record| {
                let mut record = record.clone();
                if rename && Some(record.name()) == resolved.as_ref() {
                    record.set_name(original.name().clone());
                }
                record
            })
            .collect();
        out.insert_answers(answers);
        out.insert_name_servers(response.name_servers().to_vec());
        out.insert_additionals(response.additionals().to_vec());
        if let Some(edns) = response.extensions().clone() {
            out.set_edns(edns);
        }
        out
    }
}
