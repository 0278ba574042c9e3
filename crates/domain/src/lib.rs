pub mod config;
pub mod errors;
pub mod name;

pub use config::{
    AliasRule, CliOverrides, Config, ConfigError, DnsConfig, Endpoint, LoggingConfig,
    ServerConfig, StubZone,
};
pub use errors::RelayError;
pub use name::CanonicalName;
