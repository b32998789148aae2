//! Errors raised by the dispatcher itself.

use thiserror::Error;

/// Failures the dispatcher converts into handler errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A handler, interceptor or error handler panicked while running.
    #[error("handler panicked: {0}")]
    Panicked(String),
}
