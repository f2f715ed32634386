//! Server record aggregate and its mutation payloads.

use super::{ExternalId, InternalId, ParseServerStatusError, ServerDomainError, ServerEndpoint};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Administrative status of a registered server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerStatus {
    /// Server is considered online.
    On,
    /// Server is considered offline.
    Off,
}

impl ServerStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "On",
            Self::Off => "Off",
        }
    }

    /// Returns whether this status sets the online bit.
    #[must_use]
    pub const fn is_online(self) -> bool {
        matches!(self, Self::On)
    }

    /// Maps an observed liveness flag onto a status.
    #[must_use]
    pub const fn from_online(online: bool) -> Self {
        if online { Self::On } else { Self::Off }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ServerStatus {
    type Error = ParseServerStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            _ => Err(ParseServerStatusError(value.to_owned())),
        }
    }
}

fn validated_name(name: impl Into<String>) -> Result<String, ServerDomainError> {
    let raw = name.into();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ServerDomainError::EmptyServerName);
    }
    Ok(trimmed.to_owned())
}

/// Server awaiting insertion; the registry assigns its internal identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewServer {
    external_id: ExternalId,
    name: String,
    status: ServerStatus,
    endpoint: ServerEndpoint,
    created_at: DateTime<Utc>,
}

impl NewServer {
    /// Creates a validated server draft stamped with the clock's time.
    ///
    /// # Errors
    ///
    /// Returns [`ServerDomainError::EmptyServerName`] when `name` is blank.
    pub fn new(
        external_id: ExternalId,
        name: impl Into<String>,
        status: ServerStatus,
        endpoint: ServerEndpoint,
        clock: &impl Clock,
    ) -> Result<Self, ServerDomainError> {
        Ok(Self {
            external_id,
            name: validated_name(name)?,
            status,
            endpoint,
            created_at: clock.utc(),
        })
    }

    /// Returns the external identifier.
    #[must_use]
    pub const fn external_id(&self) -> &ExternalId {
        &self.external_id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the initial status.
    #[must_use]
    pub const fn status(&self) -> ServerStatus {
        self.status
    }

    /// Returns the endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> ServerEndpoint {
        self.endpoint
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Materialises the stored record once an identifier has been assigned.
    #[must_use]
    pub fn into_record(self, internal_id: InternalId) -> ServerRecord {
        ServerRecord {
            internal_id,
            external_id: self.external_id,
            name: self.name,
            status: self.status,
            endpoint: self.endpoint,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Parameter object for reconstructing a persisted server record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedServerData {
    /// Persisted internal identifier.
    pub internal_id: InternalId,
    /// Persisted external identifier.
    pub external_id: ExternalId,
    /// Persisted display name.
    pub name: String,
    /// Persisted status.
    pub status: ServerStatus,
    /// Persisted endpoint.
    pub endpoint: ServerEndpoint,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Registered server record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRecord {
    internal_id: InternalId,
    external_id: ExternalId,
    name: String,
    status: ServerStatus,
    endpoint: ServerEndpoint,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ServerRecord {
    /// Reconstructs a record from persistence.
    #[must_use]
    pub fn from_persisted(data: PersistedServerData) -> Self {
        Self {
            internal_id: data.internal_id,
            external_id: data.external_id,
            name: data.name,
            status: data.status,
            endpoint: data.endpoint,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the internal identifier.
    #[must_use]
    pub const fn internal_id(&self) -> InternalId {
        self.internal_id
    }

    /// Returns the external identifier.
    #[must_use]
    pub const fn external_id(&self) -> &ExternalId {
        &self.external_id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> ServerStatus {
        self.status
    }

    /// Returns the endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> ServerEndpoint {
        self.endpoint
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Applies the supplied fields of `patch`, leaving the rest untouched.
    pub fn apply_patch(&mut self, patch: &ServerPatch, updated_at: DateTime<Utc>) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        let address = patch.address.unwrap_or_else(|| self.endpoint.address());
        let port = patch.port.unwrap_or_else(|| self.endpoint.port());
        self.endpoint = ServerEndpoint::new(address, port);
        self.updated_at = updated_at;
    }

    /// Records an observed status.
    pub fn set_status(&mut self, status: ServerStatus, updated_at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = updated_at;
    }
}

/// Partial update for a server record; `None` fields stay unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerPatch {
    name: Option<String>,
    status: Option<ServerStatus>,
    address: Option<Ipv4Addr>,
    port: Option<u16>,
}

impl ServerPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a new display name.
    ///
    /// # Errors
    ///
    /// Returns [`ServerDomainError::EmptyServerName`] when `name` is blank.
    pub fn with_name(mut self, name: impl Into<String>) -> Result<Self, ServerDomainError> {
        self.name = Some(validated_name(name)?);
        Ok(self)
    }

    /// Sets a new status.
    #[must_use]
    pub const fn with_status(mut self, status: ServerStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets a new IPv4 address.
    #[must_use]
    pub const fn with_address(mut self, address: Ipv4Addr) -> Self {
        self.address = Some(address);
        self
    }

    /// Sets a new port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Returns the patched name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the patched status, if any.
    #[must_use]
    pub const fn status(&self) -> Option<ServerStatus> {
        self.status
    }

    /// Returns the patched address, if any.
    #[must_use]
    pub const fn address(&self) -> Option<Ipv4Addr> {
        self.address
    }

    /// Returns the patched port, if any.
    #[must_use]
    pub const fn port(&self) -> Option<u16> {
        self.port
    }

    /// Returns whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.status.is_none() && self.address.is_none() && self.port.is_none()
    }
}
