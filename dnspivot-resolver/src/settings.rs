use crate::error::ResolverError;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_NAMESERVER: IpAddr = IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8));
pub const DEFAULT_PORT: u16 = 53;
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Udp,
    Tcp,
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Udp => write!(f, "udp"),
            Transport::Tcp => write!(f, "tcp"),
        }
    }
}

/// Where and how the client talks to its single nameserver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSettings {
    pub nameserver: IpAddr,
    pub port: u16,
    pub transport: Transport,
    pub timeout: Duration,
    pub ipv6: bool,
}

impl ResolverSettings {
    pub fn new(nameserver: IpAddr) -> Self {
        Self {
            nameserver,
            port: DEFAULT_PORT,
            transport: Transport::Udp,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            ipv6: true,
        }
    }

    /// Parse `1.1.1.1`, `1.1.1.1:5353`, `::1` or `[::1]:5353`.
    ///
    /// A port given in `value` wins over the default port.
    pub fn from_nameserver(value: &str) -> Result<Self, ResolverError> {
        let value = value.trim();
        if let Ok(addr) = value.parse::<SocketAddr>() {
            return Ok(Self::new(addr.ip()).with_port(addr.port()));
        }
        value
            .parse::<IpAddr>()
            .map(Self::new)
            .map_err(|_| ResolverError::InvalidNameserver(value.to_string()))
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_ipv6(mut self, ipv6: bool) -> Self {
        self.ipv6 = ipv6;
        self
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.nameserver, self.port)
    }

    pub fn validate(&self) -> Result<(), ResolverError> {
        if self.timeout.is_zero() {
            return Err(ResolverError::InvalidTimeout(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(ResolverError::InvalidNameserver(format!(
                "{} has port 0",
                self.nameserver
            )));
        }
        Ok(())
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESERVER)
    }
}
