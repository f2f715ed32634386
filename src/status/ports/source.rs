//! Port for the at-least-once health event transport.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for event source operations.
pub type HealthEventSourceResult<T> = Result<T, HealthEventSourceError>;

/// Callback that marks a delivery as consumed on the transport.
pub type Acknowledger = Box<dyn FnOnce() + Send>;

/// Pull-based stream of raw health event payloads.
#[async_trait]
pub trait HealthEventSource: Send {
    /// Waits for the next delivery; `None` means the stream has ended.
    ///
    /// # Errors
    ///
    /// Returns [`HealthEventSourceError`] when the transport fails.
    async fn next_delivery(&mut self) -> HealthEventSourceResult<Option<Delivery>>;
}

/// One raw payload plus its transport acknowledgement.
pub struct Delivery {
    payload: Vec<u8>,
    acknowledger: Option<Acknowledger>,
}

impl Delivery {
    /// Creates a delivery that runs `acknowledger` when acknowledged.
    #[must_use]
    pub fn new(payload: Vec<u8>, acknowledger: Acknowledger) -> Self {
        Self {
            payload,
            acknowledger: Some(acknowledger),
        }
    }

    /// Creates a delivery for a transport without acknowledgements.
    #[must_use]
    pub const fn unacknowledged(payload: Vec<u8>) -> Self {
        Self {
            payload,
            acknowledger: None,
        }
    }

    /// Returns the raw payload.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Acknowledges the delivery. Later calls do nothing.
    pub fn acknowledge(&mut self) {
        if let Some(acknowledger) = self.acknowledger.take() {
            acknowledger();
        }
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Delivery")
            .field("payload_len", &self.payload.len())
            .field("acknowledged", &self.acknowledger.is_none())
            .finish()
    }
}

/// Errors returned by event sources.
#[derive(Debug, Clone, Error)]
pub enum HealthEventSourceError {
    /// The transport failed while receiving.
    #[error("health event transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl HealthEventSourceError {
    /// Wraps a transport failure.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
