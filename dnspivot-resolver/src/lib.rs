pub mod client;
pub mod error;
pub mod settings;

pub use client::{DnsClient, Resolver, normalize_hostname};
pub use error::{LookupError, ResolverError};
pub use settings::{ResolverSettings, Transport};
