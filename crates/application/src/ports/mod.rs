mod exchanger;
mod hosts;

pub use exchanger::{DnsExchanger, ForwardPlan};
pub use hosts::{HostsAnswer, HostsStore, NoHosts};
