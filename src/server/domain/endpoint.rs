//! Network endpoint of a registered server and the health-check address feed.

use super::{InternalId, ServerDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// IPv4 address and TCP port the health checker connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerEndpoint {
    address: Ipv4Addr,
    port: u16,
}

impl ServerEndpoint {
    /// Creates an endpoint from already-parsed parts.
    #[must_use]
    pub const fn new(address: Ipv4Addr, port: u16) -> Self {
        Self { address, port }
    }

    /// Parses the textual IPv4 address and combines it with `port`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerDomainError::InvalidAddress`] when `address` is not a
    /// dotted-quad IPv4 address.
    pub fn parse(address: &str, port: u16) -> Result<Self, ServerDomainError> {
        let parsed = address
            .trim()
            .parse::<Ipv4Addr>()
            .map_err(|_| ServerDomainError::InvalidAddress(address.to_owned()))?;
        Ok(Self::new(parsed, port))
    }

    /// Returns the IPv4 address.
    #[must_use]
    pub const fn address(&self) -> Ipv4Addr {
        self.address
    }

    /// Returns the TCP port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.address, self.port)
    }
}

/// Entry in the address feed consumed by the external health checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerAddress {
    /// Internal identifier the health checker echoes back in health events.
    pub internal_id: InternalId,
    /// Endpoint to check.
    pub endpoint: ServerEndpoint,
}

impl ServerAddress {
    /// Returns the `ip:port` form used by the health checker.
    #[must_use]
    pub fn target(&self) -> String {
        self.endpoint.to_string()
    }
}
