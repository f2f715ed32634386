//! Application services for server registry administration.

mod administration;

pub use administration::{
    CreateServerRequest, ServerAdministrationError, ServerAdministrationResult,
    ServerAdministrationService,
};
