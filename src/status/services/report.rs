//! Fleet summary combining registry size, cache count, and uptime.

use super::{UptimeAggregator, UptimeAggregatorError};
use crate::server::ports::{ServerRegistryError, ServerRegistryRepository};
use crate::status::{
    domain::{SampleWindow, StatusDomainError},
    ports::{StatusCache, StatusCacheError, StatusLog},
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Fleet-wide liveness summary for a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FleetSummary {
    /// Registered servers.
    pub num_servers: u64,
    /// Set bits in the status cache.
    pub num_online: u64,
    /// `num_servers - num_online`, floored at zero while the cache lags.
    pub num_offline: u64,
    /// Mean of per-server uptime ratios in `[0, 1]`.
    pub mean_uptime_ratio: f64,
    /// Whether any server had samples in the window.
    pub has_data: bool,
}

/// Errors surfaced while building a fleet summary.
#[derive(Debug, Clone, Error)]
pub enum FleetReportError {
    /// The window bounds were invalid.
    #[error(transparent)]
    Window(#[from] StatusDomainError),
    /// The registry count failed.
    #[error(transparent)]
    Registry(#[from] ServerRegistryError),
    /// The cache count failed.
    #[error(transparent)]
    Cache(#[from] StatusCacheError),
    /// Uptime aggregation failed.
    #[error(transparent)]
    Uptime(#[from] UptimeAggregatorError),
}

/// Read-only reporting over all three stores.
pub struct FleetReportService<R, S, L>
where
    R: ServerRegistryRepository + ?Sized,
    S: StatusCache + ?Sized,
    L: StatusLog + ?Sized,
{
    registry: Arc<R>,
    cache: Arc<S>,
    aggregator: UptimeAggregator<L>,
}

impl<R, S, L> FleetReportService<R, S, L>
where
    R: ServerRegistryRepository + ?Sized,
    S: StatusCache + ?Sized,
    L: StatusLog + ?Sized,
{
    /// Creates a report service.
    #[must_use]
    pub const fn new(registry: Arc<R>, cache: Arc<S>, aggregator: UptimeAggregator<L>) -> Self {
        Self {
            registry,
            cache,
            aggregator,
        }
    }

    /// Summarises the fleet for the window between two Unix timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`FleetReportError::Window`] for an invalid window, or the
    /// first store or aggregation failure.
    pub async fn summary(
        &self,
        start_unix: i64,
        end_unix: i64,
    ) -> Result<FleetSummary, FleetReportError> {
        let window = SampleWindow::from_unix(start_unix, end_unix)?;
        self.summary_for(&window, None).await
    }

    /// Summarises the fleet for `window`, optionally bounding the uptime
    /// query by `deadline`.
    ///
    /// # Errors
    ///
    /// Returns the first store or aggregation failure; partial results are
    /// never returned.
    pub async fn summary_for(
        &self,
        window: &SampleWindow,
        deadline: Option<Duration>,
    ) -> Result<FleetSummary, FleetReportError> {
        let num_servers = self.registry.count().await?;
        let num_online = self.cache.online_count().await?;
        let uptime = match deadline {
            Some(budget) => self.aggregator.mean_uptime_within(window, budget).await?,
            None => self.aggregator.mean_uptime(window).await?,
        };

        Ok(FleetSummary {
            num_servers,
            num_online,
            num_offline: num_servers.saturating_sub(num_online),
            mean_uptime_ratio: uptime.mean_uptime_ratio(),
            has_data: uptime.has_data(),
        })
    }
}
