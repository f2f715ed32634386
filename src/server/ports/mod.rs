//! Port contracts for server registry persistence.

mod repository;

pub use repository::{
    BulkInsertOutcome, ServerRegistryError, ServerRegistryRepository, ServerRegistryResult,
};
