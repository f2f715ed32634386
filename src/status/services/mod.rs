//! Application services for status ingestion, aggregation, and repair.

mod ingestor;
mod report;
mod resync;
mod uptime;

pub use ingestor::{IngestReport, StatusIngestError, StatusIngestor};
pub use report::{FleetReportError, FleetReportService, FleetSummary};
pub use resync::{ResyncReport, StatusResync, StatusResyncError};
pub use uptime::{UptimeAggregator, UptimeAggregatorError, UptimeAggregatorResult};
