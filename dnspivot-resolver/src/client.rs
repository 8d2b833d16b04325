use crate::error::{LookupError, ResolverError, Result};
use crate::settings::{ResolverSettings, Transport};
use async_trait::async_trait;
use hickory_resolver::{Name, TokioAsyncResolver};
use hickory_resolver::config::{
    LookupIpStrategy, NameServerConfig, Protocol, ResolverConfig, ResolverOpts,
};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::error::ProtoErrorKind;
use hickory_resolver::proto::op::ResponseCode;
use std::collections::BTreeSet;
use std::net::{IpAddr, SocketAddr};
use tracing::{debug, trace};

/// Forward and reverse lookups against one configured nameserver.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `name` to its A/AAAA addresses.
    async fn resolve_forward(&self, name: &str) -> Result<BTreeSet<IpAddr>>;

    /// Resolve `address` to the first name in its PTR answer.
    async fn resolve_reverse(&self, address: IpAddr) -> Result<String>;
}

/// Lowercase, trim and drop the trailing root dot.
pub fn normalize_hostname(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Resolver client backed by hickory with caching, retries and the hosts
/// file switched off, so every call is exactly one query to the nameserver.
pub struct DnsClient {
    inner: TokioAsyncResolver,
    nameserver: SocketAddr,
}

impl DnsClient {
    pub fn new(settings: ResolverSettings) -> std::result::Result<Self, ResolverError> {
        settings.validate()?;

        let protocol = match settings.transport {
            Transport::Udp => Protocol::Udp,
            Transport::Tcp => Protocol::Tcp,
        };
        let mut config = ResolverConfig::new();
        config.add_name_server(NameServerConfig::new(settings.socket_addr(), protocol));

        let mut opts = ResolverOpts::default();
        opts.timeout = settings.timeout;
        opts.attempts = 1;
        opts.cache_size = 0;
        opts.use_hosts_file = false;
        opts.ip_strategy = if settings.ipv6 {
            LookupIpStrategy::Ipv4AndIpv6
        } else {
            LookupIpStrategy::Ipv4Only
        };

        debug!(
            nameserver = %settings.socket_addr(),
            transport = %settings.transport,
            timeout_ms = settings.timeout.as_millis() as u64,
            "Configured DNS client"
        );

        Ok(Self {
            inner: TokioAsyncResolver::tokio(config, opts),
            nameserver: settings.socket_addr(),
        })
    }

    pub fn nameserver(&self) -> SocketAddr {
        self.nameserver
    }
}

#[async_trait]
impl Resolver for DnsClient {
    async fn resolve_forward(&self, name: &str) -> Result<BTreeSet<IpAddr>> {
        let hostname = normalize_hostname(name);
        // Query as FQDN so no search domain is ever appended.
        let fqdn = format!("{}.", hostname);
        trace!(hostname = %hostname, "Forward lookup");

        // Rejected locally, before anything reaches the nameserver.
        let query = match Name::from_str_relaxed(&fqdn) {
            Ok(query) => query,
            Err(e) => {
                debug!(hostname = %hostname, error = %e, "Not a valid DNS name");
                return Err(LookupError::InvalidName(hostname));
            }
        };

        match self.inner.lookup_ip(query).await {
            Ok(lookup) => {
                let addresses: BTreeSet<IpAddr> = lookup.iter().collect();
                if addresses.is_empty() {
                    Err(LookupError::NoRecordOfType(hostname))
                } else {
                    Ok(addresses)
                }
            }
            Err(e) => Err(classify_forward(&hostname, &e)),
        }
    }

    async fn resolve_reverse(&self, address: IpAddr) -> Result<String> {
        trace!(address = %address, "Reverse lookup");

        match self.inner.reverse_lookup(address).await {
            Ok(lookup) => lookup
                .iter()
                .map(|name| normalize_hostname(&name.to_string()))
                .find(|name| !name.is_empty())
                .ok_or(LookupError::NoPtrRecord(address)),
            Err(e) => Err(classify_reverse(address, &e)),
        }
    }
}

fn classify_forward(hostname: &str, error: &ResolveError) -> LookupError {
    match error.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => {
            if *response_code == ResponseCode::NXDomain {
                LookupError::NotFound(hostname.to_string())
            } else {
                LookupError::NoRecordOfType(hostname.to_string())
            }
        }
        _ => classify_failure(hostname, error),
    }
}

fn classify_reverse(address: IpAddr, error: &ResolveError) -> LookupError {
    match error.kind() {
        ResolveErrorKind::NoRecordsFound { .. } => LookupError::NoPtrRecord(address),
        _ => classify_failure(&address.to_string(), error),
    }
}

/// Map the non-answer failures shared by both query kinds.
fn classify_failure(query: &str, error: &ResolveError) -> LookupError {
    match error.kind() {
        ResolveErrorKind::Timeout => LookupError::Timeout(query.to_string()),
        ResolveErrorKind::Proto(proto) => match proto.kind() {
            ProtoErrorKind::Timeout => LookupError::Timeout(query.to_string()),
            ProtoErrorKind::LabelBytesTooLong(_) | ProtoErrorKind::DomainNameTooLong(_) => {
                LookupError::InvalidName(query.to_string())
            }
            _ => LookupError::Transport(error.to_string()),
        },
        _ => LookupError::Transport(error.to_string()),
    }
}
