//! Unit tests for status tracking.
//!
//! Tests cover the event and window domain, the two-level uptime
//! aggregation, ingestion under concurrency and store failures, resync
//! convergence, and the fleet summary.
