//! Inbound health events published by the external health checker.

use super::StatusDomainError;
use crate::server::domain::{InternalId, ServerStatus};
use serde::{Deserialize, Serialize};

/// One health-check observation for a registered server.
///
/// Events are delivered at least once and may arrive duplicated or out of
/// order for the same server. The wire form is
/// `{"id": <int>, "ipv4": "<string>", "status": <bool>}`. Extra fields added
/// by newer health checkers are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthEvent {
    #[serde(rename = "id")]
    internal_id: InternalId,
    #[serde(rename = "ipv4")]
    address: String,
    #[serde(rename = "status")]
    observed_up: bool,
}

impl HealthEvent {
    /// Creates an event.
    #[must_use]
    pub fn new(internal_id: InternalId, address: impl Into<String>, observed_up: bool) -> Self {
        Self {
            internal_id,
            address: address.into(),
            observed_up,
        }
    }

    /// Decodes an event from its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`StatusDomainError::MalformedEvent`] when the payload is not
    /// JSON, lacks one of `id`, `ipv4` or `status`, or carries one of them
    /// with the wrong type. Unrecognised fields do not make a payload
    /// malformed.
    pub fn from_json(payload: &[u8]) -> Result<Self, StatusDomainError> {
        serde_json::from_slice(payload)
            .map_err(|err| StatusDomainError::MalformedEvent(err.to_string()))
    }

    /// Returns the checked server's internal identifier.
    #[must_use]
    pub const fn internal_id(&self) -> InternalId {
        self.internal_id
    }

    /// Returns the checked address as reported by the health checker.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns whether the check succeeded.
    #[must_use]
    pub const fn observed_up(&self) -> bool {
        self.observed_up
    }

    /// Returns the observed status.
    #[must_use]
    pub const fn status(&self) -> ServerStatus {
        ServerStatus::from_online(self.observed_up)
    }
}
