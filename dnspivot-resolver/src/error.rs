use std::net::IpAddr;
use thiserror::Error;

/// Outcome of a single DNS query that did not produce a usable answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("no such domain: {0}")]
    NotFound(String),

    #[error("{0} exists but has no address records")]
    NoRecordOfType(String),

    #[error("no PTR record for {0}")]
    NoPtrRecord(IpAddr),

    #[error("no answer for {0} before the deadline")]
    Timeout(String),

    #[error("transport error: {0}")]
    Transport(String),

    /// The name could not be encoded as a DNS query, so nothing was sent.
    #[error("{0} is not a valid DNS name")]
    InvalidName(String),
}

impl LookupError {
    /// True when the failure came from the network rather than from a DNS answer.
    pub fn is_transport(&self) -> bool {
        matches!(self, LookupError::Transport(_))
    }
}

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Invalid nameserver: {0}")]
    InvalidNameserver(String),

    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),
}

pub type Result<T> = std::result::Result<T, LookupError>;
