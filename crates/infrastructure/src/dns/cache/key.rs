use hickory_proto::op::Message;
use hickory_proto::rr::{DNSClass, RecordType};

/// Cache and single-flight key: (name, type, class, DO bit).
///
/// The name is stored lower-cased so `Example.COM` and `example.com.` share
/// an entry. Transaction IDs and EDNS payload sizes are deliberately not
/// part of the key; the DNSSEC-OK bit is, so validating and non-validating
/// clients never share a response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    name: String,
    record_type: RecordType,
    class: DNSClass,
    dnssec_ok: bool,
}

impl Fingerprint {
    pub fn new(name: &str, record_type: RecordType, class: DNSClass, dnssec_ok: bool) -> Self {
        let mut name = name.to_ascii_lowercase();
        if !name.ends_with('.') {
            name.push('.');
        }
        Self {
            name,
            record_type,
            class,
            dnssec_ok,
        }
    }

    /// Key of a single-question query message. `None` when the message has
    /// no question.
    pub fn of_query(message: &Message) -> Option<Self> {
        let query = message.queries().first()?;
        let dnssec_ok = message
            .extensions()
            .as_ref()
            .map(|edns| edns.dnssec_ok())
            .unwrap_or(false);
        Some(Self::new(
            &query.name().to_utf8(),
            query.query_type(),
            query.query_class(),
            dnssec_ok,
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
