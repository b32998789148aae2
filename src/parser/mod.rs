//! HTTP parser module.
//!
//! This module provides functionality for parsing HTTP requests and decoding
//! their bodies into values handlers can work with.

mod body;
mod request;
mod method;
mod version;
mod error;

// Re-export public items
pub use body::decode_body;
pub use request::{HttpRequest, find_header_end};
pub use method::Method;
pub use version::HttpVersion;
pub use error::Error;

// Re-export the parse_request function
pub use request::parse_request;
