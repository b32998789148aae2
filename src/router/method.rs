//! Route table methods.

use std::fmt;
use std::str::FromStr;

use crate::parser::Method;
use crate::router::error::Error;

/// The methods a route can be registered under.
///
/// `All` is the wildcard table, consulted for every request regardless of
/// its method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    /// `*`: matches requests of any method.
    All,
    Get,
    Post,
    Put,
    Delete,
}

impl RouteMethod {
    /// The method-specific table a request is routed through, if any.
    ///
    /// Methods outside the closed set only ever reach wildcard routes.
    pub fn for_request(method: Method) -> Option<Self> {
        match method {
            Method::GET => Some(RouteMethod::Get),
            Method::POST => Some(RouteMethod::Post),
            Method::PUT => Some(RouteMethod::Put),
            Method::DELETE => Some(RouteMethod::Delete),
            Method::HEAD | Method::OPTIONS | Method::PATCH => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMethod::All => "*",
            RouteMethod::Get => "GET",
            RouteMethod::Post => "POST",
            RouteMethod::Put => "PUT",
            RouteMethod::Delete => "DELETE",
        }
    }
}

impl FromStr for RouteMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "*" => Ok(RouteMethod::All),
            "GET" => Ok(RouteMethod::Get),
            "POST" => Ok(RouteMethod::Post),
            "PUT" => Ok(RouteMethod::Put),
            "DELETE" => Ok(RouteMethod::Delete),
            _ => Err(Error::InvalidMethod(s.to_string())),
        }
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
