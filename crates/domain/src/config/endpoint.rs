use super::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

const DEFAULT_DNS_PORT: u16 = 53;

/// A validated upstream address. User input accepts `host`, `host:port`,
/// `[v6]` and `[v6]:port`; a missing port defaults to 53.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint(SocketAddr);

impl Endpoint {
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ConfigError::Nameserver(
                input.to_string(),
                "empty address".to_string(),
            ));
        }

        // `1.2.3.4:53`, `[::1]:53`
        if let Ok(addr) = s.parse::<SocketAddr>() {
            return Self::checked(input, addr);
        }

        // `1.2.3.4`, `::1`
        if let Ok(ip) = s.parse::<IpAddr>() {
            return Self::checked(input, SocketAddr::new(ip, DEFAULT_DNS_PORT));
        }

        // `[::1]` — bracketed v6 literal without a port
        if let Some(inner) = s.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            if let Ok(ip) = inner.parse::<IpAddr>() {
                return Self::checked(input, SocketAddr::new(ip, DEFAULT_DNS_PORT));
            }
        }

        Err(ConfigError::Nameserver(
            input.to_string(),
            "not an IP address with optional port".to_string(),
        ))
    }

    fn checked(input: &str, addr: SocketAddr) -> Result<Self, ConfigError> {
        if addr.port() == 0 {
            return Err(ConfigError::Nameserver(
                input.to_string(),
                "port cannot be 0".to_string(),
            ));
        }
        Ok(Self(addr))
    }

    pub fn addr(&self) -> SocketAddr {
        self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl TryFrom<String> for Endpoint {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Endpoint> for String {
    fn from(ep: Endpoint) -> Self {
        ep.0.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_defaults_to_53() {
        assert_eq!(Endpoint::parse("8.8.8.8").unwrap().addr().port(), 53);
        assert_eq!(
            Endpoint::parse("8.8.8.8:5353").unwrap().addr().port(),
            5353
        );
    }

    #[test]
    fn bracketed_ipv6_forms() {
        let bare = Endpoint::parse("[2001:4860:4860::8888]").unwrap();
        assert_eq!(bare.addr().port(), 53);

        let with_port = Endpoint::parse("[2001:4860:4860::8888]:5300").unwrap();
        assert_eq!(with_port.addr().port(), 5300);

        let unbracketed = Endpoint::parse("::1").unwrap();
        assert_eq!(unbracketed.addr().port(), 53);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Endpoint::parse("not-an-ip").is_err());
        assert!(Endpoint::parse("8.8.8.8:0").is_err());
        assert!(Endpoint::parse("").is_err());
        assert!(Endpoint::parse("example.com:53").is_err());
    }
}
