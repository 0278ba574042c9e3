use super::dns::DnsConfig;
use super::endpoint::Endpoint;
use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::server::ServerConfig;
use super::zones::{AliasRule, StubZone};
use crate::name::CanonicalName;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main configuration. Created once at startup, validated, then frozen.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub dns: DnsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults.
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. relay-dns.toml in current directory
    /// 3. /etc/relay-dns/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if std::path::Path::new("relay-dns.toml").exists() {
            Self::from_file("relay-dns.toml")?
        } else if std::path::Path::new("/etc/relay-dns/config.toml").exists() {
            Self::from_file("/etc/relay-dns/config.toml")?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(overrides)?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) -> Result<(), ConfigError> {
        if let Some(listen) = overrides.listen {
            self.server.listen = listen;
        }
        if let Some(ns) = overrides.nameservers {
            self.dns.nameservers = ns
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        for flag in overrides.stubzones {
            self.dns.stubzones.extend(StubZone::parse_flag(&flag)?);
        }
        for flag in overrides.aliases {
            self.dns.aliases.push(AliasRule::parse_flag(&flag)?);
        }
        if let Some(path) = overrides.hostsfile {
            self.dns.hostsfile = if path.is_empty() { None } else { Some(path) };
        }
        if let Some(poll) = overrides.hostsfile_poll {
            self.dns.hostsfile_poll = poll;
        }
        if let Some(sd) = overrides.search_domains {
            self.dns.search_domains = sd
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if overrides.append_search_domains {
            self.dns.append_search_domains = true;
        }
        if let Some(capacity) = overrides.rcache {
            self.dns.rcache = capacity;
        }
        if let Some(ttl) = overrides.rcache_ttl {
            self.dns.rcache_ttl = ttl;
        }
        if overrides.no_rec {
            self.dns.no_rec = true;
        }
        if let Some(n) = overrides.fwd_ndots {
            self.dns.fwd_ndots = n;
        }
        if let Some(n) = overrides.ndots {
            self.dns.ndots = n;
        }
        if overrides.round_robin {
            self.dns.round_robin = true;
        }
        if let Some(ms) = overrides.read_timeout_ms {
            self.dns.read_timeout_ms = ms;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Check every user-supplied value; an `Err` here is fatal at startup
    /// and unreachable afterwards.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;
        let upstreams = self.upstream_endpoints()?;
        if upstreams.is_empty() {
            return Err(ConfigError::Validation(
                "no upstream nameservers configured".to_string(),
            ));
        }
        for domain in self.search_list()? {
            if domain.label_count() < 2 {
                return Err(ConfigError::SearchDomain(
                    domain.to_string(),
                    "search domain must have at least one dot".to_string(),
                ));
            }
        }
        for stub in &self.dns.stubzones {
            stub.zone_name()?;
            stub.endpoints()?;
        }
        for alias in &self.dns.aliases {
            alias.source_name()?;
            alias.target_name()?;
        }
        if self.dns.rcache > 0 && self.dns.rcache_ttl == 0 {
            return Err(ConfigError::Validation(
                "rcache-ttl cannot be 0 while the cache is enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// The bind address; `host[:port]` with bracketed IPv6 and port 53 by
    /// default, same grammar as upstream endpoints.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = self.server.listen.trim();
        Endpoint::parse(raw)
            .map(|ep| ep.addr())
            .map_err(|e| ConfigError::Listen(raw.to_string(), e.to_string()))
    }

    pub fn upstream_endpoints(&self) -> Result<Vec<Endpoint>, ConfigError> {
        self.dns.nameservers.iter().map(|s| Endpoint::parse(s)).collect()
    }

    pub fn search_list(&self) -> Result<Vec<CanonicalName>, ConfigError> {
        self.dns
            .search_domains
            .iter()
            .map(|s| {
                CanonicalName::from_user(s)
                    .map_err(|e| ConfigError::SearchDomain(s.clone(), e.to_string()))
            })
            .collect()
    }

    /// Stub zones in insertion order, zone names canonicalised.
    pub fn stub_table(&self) -> Result<Vec<(CanonicalName, Vec<Endpoint>)>, ConfigError> {
        self.dns
            .stubzones
            .iter()
            .map(|s| Ok((s.zone_name()?, s.endpoints()?)))
            .collect()
    }

    /// Alias rewrites in insertion order.
    pub fn alias_table(&self) -> Result<Vec<(CanonicalName, CanonicalName)>, ConfigError> {
        self.dns
            .aliases
            .iter()
            .map(|a| Ok((a.source_name()?, a.target_name()?)))
            .collect()
    }
}

/// Command-line overrides applied on top of the config file.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub listen: Option<String>,
    pub nameservers: Option<String>,
    pub stubzones: Vec<String>,
    pub hostsfile: Option<String>,
    pub hostsfile_poll: Option<u64>,
    pub search_domains: Option<String>,
    pub append_search_domains: bool,
    pub rcache: Option<usize>,
    pub rcache_ttl: Option<u64>,
    pub no_rec: bool,
    pub fwd_ndots: Option<usize>,
    pub ndots: Option<usize>,
    pub aliases: Vec<String>,
    pub round_robin: bool,
    pub read_timeout_ms: Option<u64>,
    pub log_level: Option<String>,
}
