//! Adapter implementations for the status ports.

pub mod json_lines;
pub mod memory;
pub mod noop;
pub mod postgres;
pub mod redis;
