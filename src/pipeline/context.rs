//! Per-request state handed to handlers and interceptors.

use std::collections::HashMap;
use indexmap::IndexMap;
use serde_json::Value;

use crate::parser::{HttpRequest, Method, decode_body};
use crate::router::Params;

/// Everything a handler can see about the request it is serving.
///
/// A context is built fresh for each request and dropped once the response
/// has been produced. `context` is scratch space: interceptors write values
/// there for later interceptors, the handler, or the after queue to read.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Path parameters; absent when the matched pattern has none.
    pub params: Option<Params>,
    /// Query parameters; absent when the query string has no pairs.
    pub query: Option<IndexMap<String, String>>,
    /// The request path, without the query string.
    pub path: String,
    pub method: Method,
    /// All request headers, with lower-cased names.
    pub headers: HashMap<String, String>,
    /// The request headers minus `cookie`.
    pub safe_headers: HashMap<String, String>,
    /// The decoded body.
    pub body: Option<Value>,
    /// Scratch space shared along the pipeline.
    pub context: HashMap<String, Value>,
}

impl RequestContext {
    /// Build the context for `request`, with `params` taken from the matched pattern.
    pub fn from_request(request: HttpRequest, params: Option<Params>) -> Self {
        let body = decode_body(&request.body, request.content_type());

        let headers: HashMap<String, String> = request
            .headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
        let safe_headers = headers
            .iter()
            .filter(|(name, _)| name.as_str() != "cookie")
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let query = (!request.query_params.is_empty()).then_some(request.query_params);

        Self {
            params,
            query,
            path: request.path,
            method: request.method,
            headers,
            safe_headers,
            body,
            context: HashMap::new(),
        }
    }

    /// A path parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.as_ref()?.get(name).map(String::as_str)
    }

    /// A query parameter by name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.as_ref()?.get(name).map(String::as_str)
    }

    /// A header by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Store a value in the scratch space, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.context.insert(key.into(), value.into());
    }

    /// Read a value from the scratch space.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }
}
