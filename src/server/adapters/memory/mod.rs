//! In-memory adapters for the server registry.

mod repository;

pub use repository::InMemoryServerRegistry;
