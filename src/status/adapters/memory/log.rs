//! In-process status log.

use crate::server::domain::InternalId;
use crate::status::{
    domain::{SampleWindow, ServerSampleCounts, StatusSample},
    ports::{StatusLog, StatusLogError, StatusLogResult},
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Thread-safe append-only sample list.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStatusLog {
    samples: Arc<RwLock<Vec<StatusSample>>>,
}

impl InMemoryStatusLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every appended sample in append order.
    ///
    /// # Errors
    ///
    /// Returns [`StatusLogError::Backend`] when the lock is poisoned.
    pub fn samples(&self) -> StatusLogResult<Vec<StatusSample>> {
        self.samples
            .read()
            .map(|samples| samples.clone())
            .map_err(|err| StatusLogError::backend(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl StatusLog for InMemoryStatusLog {
    async fn append(&self, sample: &StatusSample) -> StatusLogResult<()> {
        self.samples
            .write()
            .map_err(|err| StatusLogError::backend(std::io::Error::other(err.to_string())))?
            .push(*sample);
        Ok(())
    }

    async fn window_counts(
        &self,
        window: &SampleWindow,
        limit: usize,
    ) -> StatusLogResult<Vec<ServerSampleCounts>> {
        let samples = self
            .samples
            .read()
            .map_err(|err| StatusLogError::backend(std::io::Error::other(err.to_string())))?;

        let mut tallies: BTreeMap<InternalId, (u64, u64)> = BTreeMap::new();
        for sample in samples
            .iter()
            .filter(|sample| window.contains(sample.sampled_at()))
        {
            let (online, total) = tallies.entry(sample.internal_id()).or_default();
            *online += u64::from(sample.status().is_online());
            *total += 1;
        }

        Ok(tallies
            .into_iter()
            .take(limit)
            .map(|(internal_id, (online, total))| {
                ServerSampleCounts::new(internal_id, online, total)
            })
            .collect())
    }
}
