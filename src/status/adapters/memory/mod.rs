//! In-process adapters for the status ports.

mod cache;
mod log;
mod source;

pub use cache::InMemoryStatusCache;
pub use log::InMemoryStatusLog;
pub use source::{ChannelSender, ChannelSource, channel_source};
