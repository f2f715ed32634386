//! Identifier types for registered servers.

use super::ServerDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length for an external identifier, matching `VARCHAR(255)`.
const MAX_EXTERNAL_ID_LENGTH: usize = 255;

/// Registry-assigned numeric identifier for a server.
///
/// The value is never reused or mutated once assigned. It doubles as the bit
/// offset in the status bitmap and as the key of status samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InternalId(u64);

impl InternalId {
    /// Wraps a raw identifier value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for InternalId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for InternalId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Caller-supplied unique business identifier for a server.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    /// Creates a validated external identifier.
    ///
    /// The input is trimmed; surrounding whitespace never forms part of the
    /// business key.
    ///
    /// # Errors
    ///
    /// Returns [`ServerDomainError`] when the identifier is empty or longer
    /// than 255 characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ServerDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(ServerDomainError::EmptyExternalId);
        }
        if trimmed.chars().count() > MAX_EXTERNAL_ID_LENGTH {
            return Err(ServerDomainError::ExternalIdTooLong(trimmed.to_owned()));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ExternalId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
