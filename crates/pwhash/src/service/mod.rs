//! Request dispatch and the owned service components.
//!
//! [`Service`] owns every piece of shared state: the [`DrainGate`], the
//! [`HandleAllocator`], the [`DigestStore`] and its [`DigestWorker`], the
//! [`StatsCollector`] and the current [`Router`]. It is built once at startup
//! and shared by reference (usually behind an `Arc`).
//!
//! All requests go through [`Service::dispatch`], which:
//!
//! 1. asks the gate for admission (rejected requests get `503` before any
//!    routing),
//! 2. parses the verb and splits the path into method name and qualifier,
//! 3. looks up the route and invokes its handler,
//! 4. samples the handler's latency for timed routes,
//! 5. releases the admission when the reply is ready.
//!
//! ## Structure
//!
//! - [`handler`] - the built-in operations (`hash`, `stats`, `shutdown`).

pub mod handler;

use crate::{
    config::ServiceConfig,
    digest::{Hasher, Sha512Base64},
    error::{Error, Result},
    gate::DrainGate,
    handle::HandleAllocator,
    reply::Reply,
    router::{Route, Router, Table, Verb},
    stats::StatsCollector,
    store::DigestStore,
    worker::DigestWorker,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Form fields of a request, from its query string and body.
pub type Form = HashMap<String, String>;

/// Method names of the built-in routes.
pub const HASH_METHOD: &str = "hash";
pub const STATS_METHOD: &str = "stats";
pub const SHUTDOWN_METHOD: &str = "shutdown";

/// A parsed request as seen by a handler.
#[derive(Debug)]
pub struct Call<'a> {
    pub verb: Verb,
    /// First path segment.
    pub method: &'a str,
    /// Segments after the method name, possibly empty strings
    /// (`/hash/` yields one empty segment).
    pub rest: Vec<&'a str>,
    pub form: &'a Form,
}

impl<'a> Call<'a> {
    /// The single segment following the method name, if the path has exactly
    /// one.
    pub fn qualifier(&self) -> Option<&'a str> {
        match self.rest.as_slice() {
            [q] => Some(*q),
            _ => None,
        }
    }
}

pub struct Service {
    config: ServiceConfig,
    gate: DrainGate,
    handles: HandleAllocator,
    store: Arc<DigestStore>,
    worker: DigestWorker,
    stats: StatsCollector,
    routes: RwLock<Arc<Router>>,
}

impl Service {
    /// Creates a service with the default SHA-512/base64 digest and the
    /// built-in routes.
    pub fn new(config: ServiceConfig) -> Self {
        Self::with_hasher(config, Arc::new(Sha512Base64))
    }

    pub fn with_hasher(config: ServiceConfig, hasher: Arc<dyn Hasher>) -> Self {
        let store = Arc::new(DigestStore::new());
        let worker = DigestWorker::new(Arc::clone(&store), hasher, config.hash_delay);

        Self {
            config,
            gate: DrainGate::new(),
            handles: HandleAllocator::new(),
            store,
            worker,
            stats: StatsCollector::new(),
            routes: RwLock::new(Arc::new(Self::default_routes())),
        }
    }

    /// The built-in routing table.
    ///
    /// | verb    | method     | handler                      |
    /// |---------|------------|------------------------------|
    /// | POST    | `hash`     | [`handler::submit_hash`] (timed) |
    /// | GET     | `hash`     | [`handler::retrieve_hash`]   |
    /// | GET     | `stats`    | [`handler::stats`]           |
    /// | generic | `shutdown` | [`handler::shutdown`]        |
    pub fn default_routes() -> Router {
        Router::new()
            .route(
                Table::Verb(Verb::Post),
                HASH_METHOD,
                Route::timed(handler::submit_hash),
            )
            .route(
                Table::Verb(Verb::Get),
                HASH_METHOD,
                Route::new(handler::retrieve_hash),
            )
            .route(
                Table::Verb(Verb::Get),
                STATS_METHOD,
                Route::new(handler::stats),
            )
            .route(
                Table::Generic,
                SHUTDOWN_METHOD,
                Route::new(handler::shutdown),
            )
    }

    /// Swaps the routing table. Requests already being dispatched finish with
    /// the table they started with.
    pub fn replace_routes(&self, router: Router) {
        *self.routes.write() = Arc::new(router);
    }

    /// Single entry point for every request.
    ///
    /// Synchronous and safe to call from any thread. Accepted submissions
    /// spawn their digest on the Tokio runtime the service was created in (or,
    /// failing that, the caller's); with neither, `POST /hash` answers `503`
    /// without allocating a handle.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, form)))]
    pub fn dispatch(&self, verb: &str, path: &str, form: &Form) -> Reply {
        let Some(_admission) = self.gate.enter() else {
            #[cfg(feature = "tracing")]
            tracing::debug!("Rejected while draining");
            return Error::ServiceShutdown.into();
        };

        let routes = Arc::clone(&self.routes.read());
        let (route, call) = match resolve(&routes, verb, path, form) {
            Ok(found) => found,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Unroutable request: {e}");
                return e.into();
            }
        };

        let start = Instant::now();
        let reply = (route.handler)(self, &call);

        if route.timed && reply.status().is_success() {
            let elapsed = start.elapsed();
            #[cfg(feature = "tracing")]
            tracing::debug!("{} /{} took {}us", call.verb, call.method, elapsed.as_micros());
            self.stats.record(elapsed);
        }

        reply
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn gate(&self) -> &DrainGate {
        &self.gate
    }

    pub fn handles(&self) -> &HandleAllocator {
        &self.handles
    }

    pub fn store(&self) -> &DigestStore {
        &self.store
    }

    pub fn worker(&self) -> &DigestWorker {
        &self.worker
    }

    pub fn stats(&self) -> &StatsCollector {
        &self.stats
    }
}

fn resolve<'a>(
    routes: &Router,
    verb: &str,
    path: &'a str,
    form: &'a Form,
) -> Result<(Route, Call<'a>)> {
    let verb: Verb = verb.parse()?;

    let mut segments = path.split('/');
    let (Some(_), Some(method)) = (segments.next(), segments.next()) else {
        return Err(Error::MethodNotAllowed {
            method: path.to_string(),
        });
    };

    let route = routes
        .lookup(verb, method)
        .ok_or_else(|| Error::MethodNotAllowed {
            method: method.to_string(),
        })?;

    Ok((
        route,
        Call {
            verb,
            method,
            rest: segments.collect(),
            form,
        },
    ))
}
