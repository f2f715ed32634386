//! In-process event source backed by a Tokio channel.

use crate::status::ports::{Delivery, HealthEventSource, HealthEventSourceResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Creates a bounded in-process transport.
///
/// The sender side publishes raw payloads; the source side yields them as
/// deliveries whose acknowledgements are counted on the shared sender.
#[must_use]
pub fn channel_source(capacity: usize) -> (ChannelSender, ChannelSource) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let acknowledged = Arc::new(AtomicU64::new(0));
    (
        ChannelSender {
            sender,
            acknowledged: Arc::clone(&acknowledged),
        },
        ChannelSource {
            receiver,
            acknowledged,
        },
    )
}

/// Publishing half of [`channel_source`].
#[derive(Debug, Clone)]
pub struct ChannelSender {
    sender: mpsc::Sender<Vec<u8>>,
    acknowledged: Arc<AtomicU64>,
}

impl ChannelSender {
    /// Publishes a raw payload, waiting for channel capacity.
    ///
    /// Returns `false` when the source has been dropped.
    pub async fn publish(&self, payload: impl Into<Vec<u8>>) -> bool {
        self.sender.send(payload.into()).await.is_ok()
    }

    /// Returns how many deliveries have been acknowledged.
    #[must_use]
    pub fn acknowledged(&self) -> u64 {
        self.acknowledged.load(Ordering::SeqCst)
    }
}

/// Consuming half of [`channel_source`]; ends once every sender is dropped.
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::Receiver<Vec<u8>>,
    acknowledged: Arc<AtomicU64>,
}

impl ChannelSource {
    /// Returns how many deliveries have been acknowledged.
    #[must_use]
    pub fn acknowledged(&self) -> u64 {
        self.acknowledged.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthEventSource for ChannelSource {
    async fn next_delivery(&mut self) -> HealthEventSourceResult<Option<Delivery>> {
        Ok(self.receiver.recv().await.map(|payload| {
            let acknowledged = Arc::clone(&self.acknowledged);
            Delivery::new(
                payload,
                Box::new(move || {
                    acknowledged.fetch_add(1, Ordering::SeqCst);
                }),
            )
        }))
    }
}
