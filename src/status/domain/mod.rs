//! Domain model for server liveness: health events, status samples, and
//! windowed uptime.

mod error;
mod event;
mod sample;
mod uptime;
mod window;

pub use error::StatusDomainError;
pub use event::HealthEvent;
pub use sample::StatusSample;
pub use uptime::{ServerSampleCounts, UptimeSummary};
pub use window::SampleWindow;
