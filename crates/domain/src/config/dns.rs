use super::zones::{AliasRule, StubZone};
use serde::{Deserialize, Serialize};

/// Resolution options: upstreams, search behaviour, cache sizing, local
/// hosts source. Field names follow the command-line surface.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DnsConfig {
    /// Ordered default upstream list, `host[:port]`.
    #[serde(default = "default_nameservers")]
    pub nameservers: Vec<String>,

    /// Ordered search list applied to short names.
    #[serde(default)]
    pub search_domains: Vec<String>,

    /// Enables search-domain expansion.
    #[serde(default)]
    pub append_search_domains: bool,

    /// Path to a hosts-format file; `None` disables the hosts database.
    #[serde(default)]
    pub hostsfile: Option<String>,

    /// Poll interval for hostsfile changes in seconds; 0 disables watching.
    #[serde(default)]
    pub hostsfile_poll: u64,

    /// Response cache capacity; 0 disables the cache.
    #[serde(default)]
    pub rcache: usize,

    /// Response cache TTL in seconds.
    #[serde(default = "default_rcache_ttl")]
    pub rcache_ttl: u64,

    /// Refuse queries that would require recursion.
    #[serde(default)]
    pub no_rec: bool,

    /// Minimum number of dots a name must have before it is forwarded.
    #[serde(default)]
    pub fwd_ndots: usize,

    /// Minimum number of dots before an initial as-is query is attempted.
    #[serde(default = "default_ndots")]
    pub ndots: usize,

    /// Rotate A/AAAA record sets from the hosts database.
    #[serde(default)]
    pub round_robin: bool,

    /// Per-upstream-attempt read timeout in milliseconds.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default)]
    pub stubzones: Vec<StubZone>,

    #[serde(default)]
    pub aliases: Vec<AliasRule>,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            nameservers: default_nameservers(),
            search_domains: vec![],
            append_search_domains: false,
            hostsfile: None,
            hostsfile_poll: 0,
            rcache: 0,
            rcache_ttl: default_rcache_ttl(),
            no_rec: false,
            fwd_ndots: 0,
            ndots: default_ndots(),
            round_robin: false,
            read_timeout_ms: default_read_timeout_ms(),
            stubzones: vec![],
            aliases: vec![],
        }
    }
}

fn default_nameservers() -> Vec<String> {
    vec!["8.8.8.8:53".to_string(), "1.1.1.1:53".to_string()]
}

fn default_rcache_ttl() -> u64 {
    60
}

fn default_ndots() -> usize {
    1
}

fn default_read_timeout_ms() -> u64 {
    2000
}
