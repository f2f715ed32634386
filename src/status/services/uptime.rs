//! Windowed uptime over the status log.

use crate::status::{
    domain::{SampleWindow, UptimeSummary},
    ports::{StatusLog, StatusLogError},
};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the uptime aggregator. No partial result is returned.
#[derive(Debug, Clone, Error)]
pub enum UptimeAggregatorError {
    /// The status log query failed.
    #[error(transparent)]
    Log(#[from] StatusLogError),
    /// More servers reported in the window than the configured cap.
    #[error("more than {cap} servers have samples in the window")]
    TooManyServers {
        /// Configured cap.
        cap: usize,
    },
    /// The caller's deadline elapsed before the query finished.
    #[error("uptime aggregation exceeded its {0:?} deadline")]
    DeadlineExceeded(Duration),
}

/// Result type for uptime aggregation.
pub type UptimeAggregatorResult<T> = Result<T, UptimeAggregatorError>;

/// Computes the mean of per-server uptime ratios for a window.
pub struct UptimeAggregator<L>
where
    L: StatusLog + ?Sized,
{
    log: Arc<L>,
    server_cap: NonZeroUsize,
}

impl<L> Clone for UptimeAggregator<L>
where
    L: StatusLog + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            log: Arc::clone(&self.log),
            server_cap: self.server_cap,
        }
    }
}

impl<L> UptimeAggregator<L>
where
    L: StatusLog + ?Sized,
{
    /// Creates an aggregator that refuses windows with more than
    /// `server_cap` reporting servers.
    #[must_use]
    pub const fn new(log: Arc<L>, server_cap: NonZeroUsize) -> Self {
        Self { log, server_cap }
    }

    /// Returns the server cap.
    #[must_use]
    pub const fn server_cap(&self) -> NonZeroUsize {
        self.server_cap
    }

    /// Averages per-server uptime ratios over servers with samples in
    /// `window`.
    ///
    /// # Errors
    ///
    /// Returns [`UptimeAggregatorError::TooManyServers`] when the window
    /// holds more reporting servers than the cap, or
    /// [`UptimeAggregatorError::Log`] when the log query fails.
    pub async fn mean_uptime(
        &self,
        window: &SampleWindow,
    ) -> UptimeAggregatorResult<UptimeSummary> {
        let cap = self.server_cap.get();
        let counts = self
            .log
            .window_counts(window, cap.saturating_add(1))
            .await?;
        if counts.len() > cap {
            return Err(UptimeAggregatorError::TooManyServers { cap });
        }
        Ok(UptimeSummary::from_counts(&counts))
    }

    /// Like [`Self::mean_uptime`], bounded by `deadline`.
    ///
    /// # Errors
    ///
    /// Returns [`UptimeAggregatorError::DeadlineExceeded`] when `deadline`
    /// elapses first, otherwise the errors of [`Self::mean_uptime`].
    pub async fn mean_uptime_within(
        &self,
        window: &SampleWindow,
        deadline: Duration,
    ) -> UptimeAggregatorResult<UptimeSummary> {
        tokio::time::timeout(deadline, self.mean_uptime(window))
            .await
            .map_err(|_| UptimeAggregatorError::DeadlineExceeded(deadline))?
    }
}
