//! A minimal HTTP router with before/after interceptor pipelines.
//!
//! Routes are registered per method (or for every method) against path
//! patterns with `:name` parameters and a trailing `*` catch-all. Each route
//! runs as a pipeline: before interceptors and the handler, then after
//! interceptors, then error handling. Whatever the pipeline produces is
//! turned into exactly one HTTP response.
//!
//! # Features
//!
//! - Pattern routing with literal-over-parameter precedence
//! - Before/after interceptors with a shared per-request context
//! - Route-level and server-wide error handlers
//! - Automatic text/JSON/markup rendering of handler replies
//! - File-system pages loaded from a `pages` directory
//! - Bounded concurrency and graceful shutdown
//!
//! # Examples
//!
//! ## Matching patterns
//!
//! ```
//! use microroute::{extract_params, matches_pattern};
//!
//! assert!(matches_pattern("/users/42/", "/users/:id"));
//!
//! let params = extract_params("/users/42", "/users/:id").unwrap();
//! assert_eq!(params["id"], "42");
//! ```
//!
//! ## Serving routes
//!
//! ```no_run
//! use microroute::{Flow, HttpServer, RequestContext, Route, RouteMethod, ServerConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = HttpServer::new(ServerConfig::from_env());
//!
//!     server.get("/hello/:name", |req| {
//!         let name = req.param("name").unwrap_or("world").to_string();
//!         async move { Ok(Flow::reply(json!({ "hello": name }))) }
//!     })?;
//!
//!     let admin = Route::new(|_req: &mut RequestContext| async { Ok(Flow::reply("welcome")) })
//!         .before(|req: &mut RequestContext| {
//!             let allowed = req.header("authorization").is_some();
//!             async move { Ok(if allowed { Flow::Next } else { Flow::Stop }) }
//!         });
//!     server.route(RouteMethod::Get, "/admin", admin)?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Parsing requests
//!
//! ```
//! use microroute::{parse_request, ParserError};
//!
//! let request = parse_request(b"GET /search?q=rust HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
//! assert_eq!(request.path, "/search");
//! assert_eq!(request.get_query_param("q").map(String::as_str), Some("rust"));
//!
//! let invalid = parse_request(b"INVALID /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n");
//! assert!(matches!(invalid, Err(ParserError::InvalidMethod(_))));
//! ```
//!
//! See the `demos` directory for complete servers.

// Export the parser module
pub mod parser;

// Export the router module
pub mod router;

// Export the pipeline module
pub mod pipeline;

// Export the pages module
pub mod pages;

// Export the server module
pub mod server;

// Re-export commonly used items for convenience
pub use parser::{Error as ParserError, HttpRequest, HttpVersion, Method, parse_request};
pub use router::{Error as RouterError, RouteMethod, extract_params, matches_pattern, strip_trailing_slash};
pub use pipeline::{Flow, HandlerError, Markup, Render, Reply, RequestContext, Route};
pub use server::{Error as ServerError, HttpResponse, HttpServer, ServerConfig, ServerHandle, StatusCode};
