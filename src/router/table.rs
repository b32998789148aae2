//! Per-method route tables.

use std::collections::HashMap;
use indexmap::IndexMap;
use log::debug;

use crate::parser::Method;
use crate::router::error::Error;
use crate::router::method::RouteMethod;
use crate::router::pattern::{Params, Pattern};

#[derive(Debug)]
struct Entry<R> {
    pattern: Pattern,
    route: R,
}

/// The result of resolving a path: the route and the pattern it matched.
#[derive(Debug)]
pub struct RouteMatch<'a, R> {
    /// The route registered under the pattern.
    pub route: &'a R,
    /// The pattern that matched; parameters are extracted against it.
    pub pattern: &'a Pattern,
}

impl<R> Clone for RouteMatch<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for RouteMatch<'_, R> {}

impl<R> RouteMatch<'_, R> {
    /// Bind the matched pattern's parameters against `path`.
    pub fn params(&self, path: &str, strict: bool) -> Option<Params> {
        self.pattern.extract(path, strict)
    }
}

/// Routes keyed by method and pattern, in registration order.
///
/// The table is built once before serving and only read afterwards, so it can
/// be shared between connections without locking.
#[derive(Debug)]
pub struct RouteTable<R> {
    tables: HashMap<RouteMethod, IndexMap<String, Entry<R>>>,
}

impl<R> Default for RouteTable<R> {
    fn default() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }
}

impl<R> RouteTable<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `route` to `(method, pattern)`.
    ///
    /// A pair can only be bound once; a second registration is rejected
    /// rather than replacing the first.
    pub fn register(&mut self, method: RouteMethod, pattern: &str, route: R) -> Result<(), Error> {
        let table = self.tables.entry(method).or_default();
        if table.contains_key(pattern) {
            return Err(Error::DuplicateRoute {
                method,
                pattern: pattern.to_string(),
            });
        }

        let compiled = Pattern::compile(pattern)?;
        debug!("Registering route {method} {pattern}");
        table.insert(pattern.to_string(), Entry { pattern: compiled, route });
        Ok(())
    }

    /// Find the best route for `path` in a single method table.
    ///
    /// Patterns without `:name` segments win over parameterized ones; within
    /// a class the earliest registration wins.
    pub fn lookup(&self, method: RouteMethod, path: &str, strict: bool) -> Option<RouteMatch<'_, R>> {
        let table = self.tables.get(&method)?;

        let best = table
            .values()
            .enumerate()
            .filter(|(_, entry)| entry.pattern.matches(path, strict))
            .min_by_key(|(index, entry)| (entry.pattern.specificity(), *index))
            .map(|(_, entry)| RouteMatch {
                route: &entry.route,
                pattern: &entry.pattern,
            });

        if let Some(found) = &best {
            debug!("Resolved {method} {path} to pattern {pattern}", pattern = found.pattern.as_str());
        }

        best
    }

    /// Resolve a request: the wildcard table first, then the method's own table.
    pub fn resolve(&self, method: Method, path: &str, strict: bool) -> Option<RouteMatch<'_, R>> {
        self.lookup(RouteMethod::All, path, strict).or_else(|| {
            RouteMethod::for_request(method).and_then(|route_method| self.lookup(route_method, path, strict))
        })
    }

    /// Every registered `(method, pattern)` pair, grouped by method.
    pub fn routes(&self) -> Vec<(RouteMethod, &str)> {
        let order = [
            RouteMethod::All,
            RouteMethod::Get,
            RouteMethod::Post,
            RouteMethod::Put,
            RouteMethod::Delete,
        ];

        order
            .iter()
            .filter_map(|method| self.tables.get(method).map(|table| (*method, table)))
            .flat_map(|(method, table)| table.keys().map(move |pattern| (method, pattern.as_str())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tables.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
