//! Two-level uptime aggregation.
//!
//! The fleet ratio is the mean of per-server ratios, so every server weighs
//! the same regardless of how many samples it produced. Servers without
//! samples in the window are excluded rather than scored as zero.

use crate::server::domain::InternalId;

/// Sample tallies for one server inside a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSampleCounts {
    /// Server the tallies belong to.
    pub internal_id: InternalId,
    /// Samples with status `On`.
    pub online: u64,
    /// All samples.
    pub total: u64,
}

impl ServerSampleCounts {
    /// Creates a tally.
    #[must_use]
    pub const fn new(internal_id: InternalId, online: u64, total: u64) -> Self {
        Self {
            internal_id,
            online,
            total,
        }
    }

    /// Returns the fraction of `On` samples, or `None` without samples.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "per-window sample counts stay far below 2^52"
    )]
    #[expect(clippy::float_arithmetic, reason = "uptime is a fractional ratio")]
    pub fn ratio(&self) -> Option<f64> {
        (self.total > 0).then(|| (self.online.min(self.total) as f64) / (self.total as f64))
    }
}

/// Mean uptime over the servers that reported in a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UptimeSummary {
    servers_with_data: usize,
    mean_uptime_ratio: f64,
}

impl UptimeSummary {
    /// Summary for a window without any samples.
    pub const NO_DATA: Self = Self {
        servers_with_data: 0,
        mean_uptime_ratio: 0.0,
    };

    /// Averages the per-server ratios of `counts`.
    ///
    /// Entries with no samples are skipped.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "server counts are bounded by the aggregation cap"
    )]
    #[expect(
        clippy::float_arithmetic,
        reason = "the fleet ratio is a mean of fractional ratios"
    )]
    pub fn from_counts(counts: &[ServerSampleCounts]) -> Self {
        let (servers_with_data, ratio_sum) = counts
            .iter()
            .filter_map(ServerSampleCounts::ratio)
            .fold((0_usize, 0.0_f64), |(servers, sum), ratio| {
                (servers + 1, sum + ratio)
            });
        if servers_with_data == 0 {
            return Self::NO_DATA;
        }
        Self {
            servers_with_data,
            mean_uptime_ratio: ratio_sum / servers_with_data as f64,
        }
    }

    /// Returns how many servers had at least one sample.
    #[must_use]
    pub const fn servers_with_data(&self) -> usize {
        self.servers_with_data
    }

    /// Returns the mean of per-server ratios, in `[0, 1]`; `0` without data.
    #[must_use]
    pub const fn mean_uptime_ratio(&self) -> f64 {
        self.mean_uptime_ratio
    }

    /// Returns whether any server had samples in the window.
    #[must_use]
    pub const fn has_data(&self) -> bool {
        self.servers_with_data > 0
    }
}
