use crate::engine::Discovery;
use dnspivot_resolver::{LookupError, ResolverError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("cannot record {hostname}: parent {parent} has not been discovered")]
    UnknownParent { hostname: String, parent: String },

    #[error("cannot record {0} without any addresses")]
    EmptyAddressSet(String),
}

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("resolver unreachable after {failures} consecutive transport failures: {last_error}")]
    ResolverUnreachable {
        failures: usize,
        last_error: LookupError,
        /// Everything found before the run was aborted.
        partial: Box<Discovery>,
    },

    #[error("Resolver configuration error: {0}")]
    Resolver(#[from] ResolverError),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Wordlist error: {0}")]
    Wordlist(String),
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
