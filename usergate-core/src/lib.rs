//! usergate core - bearer token gate and user resource routing
//!
//! This crate holds everything that does not depend on an HTTP stack:
//! the credential check, the route table, the user model and its store,
//! and configuration loading.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod store;
pub mod types;

pub use auth::{BearerGate, Rejection, AUTHORIZATION_HEADER, TOKEN_PREFIX};
pub use config::UsergateConfig;
pub use error::{Result, UsergateError};
pub use routes::{Method, Operation, PathTemplate, Route, RouteMatch, RouteTable};
pub use store::{InMemoryUserStore, UserStore};
pub use types::{NewUser, User, UserId, UserPatch};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.contains('.'));
    }
}
