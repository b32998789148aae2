//! HTTP server for microroute-rs.
//!
//! The server owns the listener and the connection lifecycle: it reads one
//! request per connection, hands it to the dispatcher, and writes back the
//! response. Routing and the interceptor pipeline live in their own modules.

mod response;
mod config;
mod error;
mod http_server;
mod tests;

// Re-export public items
pub use response::{HttpResponse, StatusCode};
pub use config::ServerConfig;
pub use error::Error;
pub use http_server::{HttpServer, ServerHandle};
