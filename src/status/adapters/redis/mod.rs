//! Redis adapter for the status cache.

mod cache;

pub use cache::RedisStatusCache;
