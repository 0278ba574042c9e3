use std::net::SocketAddr;
use thiserror::Error;

/// Runtime errors of the resolver core.
///
/// `Clone` so a single upstream outcome can be shared with every task
/// coalesced onto the same in-flight fetch.
#[derive(Error, Debug, Clone)]
pub enum RelayError {
    #[error("Invalid domain name: {0}")]
    InvalidName(String),

    #[error("Malformed DNS message: {0}")]
    Decode(String),

    #[error("Failed to encode DNS message: {0}")]
    Encode(String),

    #[error("Timeout waiting for {server}")]
    Timeout { server: SocketAddr },

    #[error("I/O error talking to {server}: {detail}")]
    Io { server: SocketAddr, detail: String },

    #[error("Upstream {server} returned a response that does not match the query")]
    UpstreamMismatch { server: SocketAddr },

    #[error("Upstream {server} answered {rcode}")]
    UpstreamRcode { server: SocketAddr, rcode: String },

    #[error("All upstream servers failed")]
    AllUpstreamsFailed,

    #[error("Hosts file error: {0}")]
    Hosts(String),
}
