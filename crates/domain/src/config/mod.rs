mod dns;
mod endpoint;
mod errors;
mod logging;
mod root;
mod server;
mod zones;

pub use dns::DnsConfig;
pub use endpoint::Endpoint;
pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use root::{CliOverrides, Config};
pub use server::ServerConfig;
pub use zones::{AliasRule, StubZone};
