use relay_dns_domain::{CliOverrides, Config, ConfigError};
use tracing_subscriber::EnvFilter;

pub fn load_config(path: Option<&str>, overrides: CliOverrides) -> Result<Config, ConfigError> {
    Config::load(path, overrides)
}

/// `RUST_LOG` wins over the configured level when set.
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
