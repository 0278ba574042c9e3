use super::endpoint::Endpoint;
use super::errors::ConfigError;
use crate::name::CanonicalName;
use serde::{Deserialize, Serialize};

/// A subtree of the namespace forwarded to a dedicated upstream set.
///
/// Command-line form: `zone[,zone]/endpoint[,endpoint]`. One flag may fan
/// out to several zones; each becomes its own `StubZone` so insertion order
/// (the longest-match tie-break) stays observable.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StubZone {
    pub zone: String,

    pub servers: Vec<String>,
}

impl StubZone {
    /// Parse the repeatable `--stubzone` flag into one entry per zone.
    pub fn parse_flag(input: &str) -> Result<Vec<StubZone>, ConfigError> {
        let (zones, servers) = split_rule(input)
            .ok_or_else(|| ConfigError::StubZone(input.to_string(), "expected zone[,zone]/endpoint[,endpoint]".to_string()))?;

        let servers: Vec<String> = servers
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if servers.is_empty() {
            return Err(ConfigError::StubZone(
                input.to_string(),
                "no endpoints".to_string(),
            ));
        }

        let mut out = Vec::new();
        for zone in zones.split(',') {
            let zone = zone.trim();
            if zone.is_empty() {
                return Err(ConfigError::StubZone(
                    input.to_string(),
                    "empty zone".to_string(),
                ));
            }
            out.push(StubZone {
                zone: zone.to_string(),
                servers: servers.clone(),
            });
        }
        Ok(out)
    }

    pub fn zone_name(&self) -> Result<CanonicalName, ConfigError> {
        CanonicalName::from_user(&self.zone)
            .map_err(|e| ConfigError::StubZone(self.zone.clone(), e.to_string()))
    }

    pub fn endpoints(&self) -> Result<Vec<Endpoint>, ConfigError> {
        self.servers
            .iter()
            .map(|s| {
                Endpoint::parse(s)
                    .map_err(|e| ConfigError::StubZone(self.zone.clone(), e.to_string()))
            })
            .collect()
    }
}

/// A zone-name rewrite applied before routing. Command-line form:
/// `source/target`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AliasRule {
    pub source: String,

    pub target: String,
}

impl AliasRule {
    pub fn parse_flag(input: &str) -> Result<AliasRule, ConfigError> {
        let (source, target) = split_rule(input).ok_or_else(|| {
            ConfigError::Alias(input.to_string(), "expected source/target".to_string())
        })?;
        Ok(AliasRule {
            source: source.to_string(),
            target: target.to_string(),
        })
    }

    pub fn source_name(&self) -> Result<CanonicalName, ConfigError> {
        CanonicalName::from_user(&self.source)
            .map_err(|e| ConfigError::Alias(self.source.clone(), e.to_string()))
    }

    pub fn target_name(&self) -> Result<CanonicalName, ConfigError> {
        CanonicalName::from_user(&self.target)
            .map_err(|e| ConfigError::Alias(self.target.clone(), e.to_string()))
    }
}

fn split_rule(input: &str) -> Option<(&str, &str)> {
    let mut parts = input.splitn(2, '/');
    let left = parts.next()?.trim();
    let right = parts.next()?.trim();
    if left.is_empty() || right.is_empty() {
        return None;
    }
    Some((left, right))
}
