//! Error types for route registration.

use thiserror::Error;

use crate::router::method::RouteMethod;

/// Errors raised while building a route table.
///
/// These are startup errors: a table that fails to build should keep the
/// server from starting at all.
#[derive(Debug, Error)]
pub enum Error {
    /// The `(method, pattern)` pair already has a handler bound.
    #[error("Route {method} {pattern} already has a handler bound")]
    DuplicateRoute {
        /// The table the route was registered in.
        method: RouteMethod,
        /// The pattern exactly as registered.
        pattern: String,
    },

    /// The pattern cannot be compiled.
    #[error("Invalid route pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The method is not one of GET, POST, PUT, DELETE or `*`.
    #[error("Invalid route method: {0}")]
    InvalidMethod(String),
}
