pub mod cache;
pub mod forwarding;
pub mod hosts;
pub mod metrics;
pub mod resolver;
pub mod server;
pub mod transport;

pub use cache::{Fingerprint, ResponseCache};
pub use forwarding::Forwarder;
pub use hosts::{HostsDb, HostsWatcher};
pub use metrics::ServerMetrics;
pub use resolver::CachedExchanger;
pub use server::DnsServerHandler;
