//! Port contracts for the status stores and the inbound event transport.

mod cache;
mod log;
mod source;

#[cfg(test)]
pub use cache::MockStatusCache;
pub use cache::{StatusCache, StatusCacheError, StatusCacheResult};
pub use log::{StatusLog, StatusLogError, StatusLogResult};
pub use source::{
    Acknowledger, Delivery, HealthEventSource, HealthEventSourceError, HealthEventSourceResult,
};
