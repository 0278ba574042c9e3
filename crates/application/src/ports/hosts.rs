use hickory_proto::rr::RecordType;
use relay_dns_domain::CanonicalName;
use std::net::IpAddr;

/// Outcome of a hosts-database lookup for one (name, type) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostsAnswer {
    /// Address records for the requested family; round-robin rotation, when
    /// enabled, has already been applied.
    Addresses(Vec<IpAddr>),

    /// Names bound to the address a PTR question points at, in insertion
    /// order.
    Pointers(Vec<CanonicalName>),

    /// The name exists in the database but has no data of the requested
    /// type. Answered as NOERROR with an empty answer section.
    NoData,

    /// The name is unknown to the database.
    Miss,
}

impl HostsAnswer {
    pub fn is_miss(&self) -> bool {
        matches!(self, HostsAnswer::Miss)
    }
}

/// Synchronous lookup into the hosts database snapshot.
pub trait HostsStore: Send + Sync {
    fn lookup(&self, name: &CanonicalName, record_type: RecordType) -> HostsAnswer;
}

/// The empty database: every lookup misses. Used when no hostsfile is
/// configured.
pub struct NoHosts;

impl HostsStore for NoHosts {
    fn lookup(&self, _name: &CanonicalName, _record_type: RecordType) -> HostsAnswer {
        HostsAnswer::Miss
    }
}
