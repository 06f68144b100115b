//! Verb and method routing.
//!
//! A [`Router`] maps a [`Verb`] and the first path segment (the *method name*)
//! to a [`Route`]. Each supported verb has its own table; a generic table holds
//! verb-independent operations such as `shutdown` and is consulted when the
//! verb's own table has no entry. Adding an operation is one
//! [`Router::insert`] call.

use crate::error::{Error, Result};
use crate::service::{Call, Service};
use crate::reply::Reply;
use core::fmt;
use core::str::FromStr;
use std::collections::HashMap;

/// Request verbs the service routes on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
}

impl Verb {
    /// Verbs advertised when an unsupported one is used.
    pub const SUPPORTED: &'static [&'static str] = &["GET", "POST"];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            other => Err(Error::VerbNotAllowed {
                verb: other.to_string(),
            }),
        }
    }
}

/// Handler invoked for a routed request.
pub type Handler = fn(&Service, &Call<'_>) -> Reply;

/// A routing table entry.
#[derive(Clone, Copy)]
pub struct Route {
    pub handler: Handler,
    /// Successful calls are sampled into the service statistics.
    pub timed: bool,
}

impl Route {
    pub const fn new(handler: Handler) -> Self {
        Self {
            handler,
            timed: false,
        }
    }

    pub const fn timed(handler: Handler) -> Self {
        Self {
            handler,
            timed: true,
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route").field("timed", &self.timed).finish()
    }
}

/// Which table a route lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Table {
    Verb(Verb),
    /// Verb-independent routes.
    Generic,
}

#[derive(Clone, Debug, Default)]
pub struct Router {
    tables: HashMap<Table, HashMap<String, Route>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `route` for `method` in `table`, replacing any previous
    /// entry.
    pub fn insert(&mut self, table: Table, method: impl Into<String>, route: Route) -> &mut Self {
        self.tables
            .entry(table)
            .or_default()
            .insert(method.into(), route);
        self
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn route(mut self, table: Table, method: impl Into<String>, route: Route) -> Self {
        self.insert(table, method, route);
        self
    }

    /// Finds the route for `verb` and `method`, falling back to the generic
    /// table.
    pub fn lookup(&self, verb: Verb, method: &str) -> Option<Route> {
        self.find(Table::Verb(verb), method)
            .or_else(|| self.find(Table::Generic, method))
    }

    fn find(&self, table: Table, method: &str) -> Option<Route> {
        self.tables.get(&table)?.get(method).copied()
    }
}
