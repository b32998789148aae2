//! Route resolution.
//!
//! Patterns are compiled once at registration time and kept in per-method
//! tables. Resolution consults the wildcard table before the table for the
//! request's own method, and prefers literal patterns over dynamic ones.

mod error;
mod method;
mod pattern;
mod table;

pub use error::Error;
pub use method::RouteMethod;
pub use pattern::{Params, Pattern, Specificity, extract_params, matches_pattern, strip_trailing_slash};
pub use table::{RouteMatch, RouteTable};
