#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    FileRead(String, String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid listen address {0}: {1}")]
    Listen(String, String),

    #[error("Invalid nameserver {0}: {1}")]
    Nameserver(String, String),

    #[error("Invalid search domain {0}: {1}")]
    SearchDomain(String, String),

    #[error("Invalid stubzone {0}: {1}")]
    StubZone(String, String),

    #[error("Invalid alias {0}: {1}")]
    Alias(String, String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}
