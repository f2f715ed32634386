//! Domain model for registered servers.
//!
//! Server records carry a registry-assigned internal identifier, a unique
//! caller-supplied external identifier, and the endpoint the health checker
//! watches.
//! Search parameters are validated here before they reach any adapter.

mod endpoint;
mod error;
mod ids;
mod query;
mod server;

pub use endpoint::{ServerAddress, ServerEndpoint};
pub use error::{ParseServerStatusError, ServerDomainError};
pub use ids::{ExternalId, InternalId};
pub use query::{
    IdRange, PortFilter, ServerFilter, ServerQuery, SortColumn, SortOrder, UNFILTERED_PORT,
};
pub use server::{NewServer, PersistedServerData, ServerPatch, ServerRecord, ServerStatus};
