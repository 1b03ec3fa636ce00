//! Router whose routes are composed with per-group decorator chains
//!
//! Path matching is delegated to an [`axum::Router`], which serves as the
//! dispatch table shared by the root [`Mux`] and every [`Group`] derived from
//! it. Each scope privately owns its decorator chain; a handler is composed
//! with its scope's chain once, at registration.

use super::chain::{Chain, Decorator};
use super::handler::Handler;
use axum::extract::Request;
use axum::response::Response;
use axum::routing::{any_service, on_service, MethodFilter};
use std::future::Future;
use tracing::debug;

/// Root of a routing tree.
///
/// ```ignore
/// let mut mux = Mux::new();
/// mux.use_global([recover_panic(), log_request()]);
/// mux.handle_fn("GET /health", |_req| async { "ok".into_response() });
/// mux.group(|api| {
///     api.use_route([set_response_header(CACHE_CONTROL, HeaderValue::from_static("no-store"))]);
///     api.handle("GET /api/reports", Handler::from_handler(list_reports));
/// });
/// let app = mux.into_router();
/// ```
#[derive(Default)]
pub struct Mux {
    table: axum::Router,
    global: Chain,
    routes: Chain,
}

impl Mux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append decorators that wrap the whole dispatch table, including
    /// requests that match no route.
    pub fn use_global(&mut self, decorators: impl IntoIterator<Item = Decorator>) -> &mut Self {
        self.global.append(decorators);
        self
    }

    /// Append decorators to the root route chain. Routes registered and
    /// groups created afterwards inherit them.
    pub fn use_route(&mut self, decorators: impl IntoIterator<Item = Decorator>) -> &mut Self {
        self.routes.append(decorators);
        self
    }

    /// Register `handler` under `pattern` (`"/path"` or `"GET /path"`).
    ///
    /// # Panics
    /// Panics if the pattern conflicts with an existing registration, as
    /// [`axum::Router::route`] does.
    pub fn handle(&mut self, pattern: &str, handler: Handler) -> &mut Self {
        register(&mut self.table, &self.routes, pattern, handler);
        self
    }

    pub fn handle_fn<F, Fut>(&mut self, pattern: &str, f: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.handle(pattern, Handler::new(f))
    }

    /// Open a scope seeded with a copy of the root route chain
    pub fn group<F>(&mut self, configure: F) -> &mut Self
    where
        F: FnOnce(&mut Group<'_>),
    {
        let mut group = Group {
            table: &mut self.table,
            chain: self.routes.clone(),
        };
        configure(&mut group);
        self
    }

    pub fn global_chain(&self) -> &Chain {
        &self.global
    }

    pub fn route_chain(&self) -> &Chain {
        &self.routes
    }

    /// Compose the global chain around the dispatch table, once
    pub fn into_handler(self) -> Handler {
        debug!(global = ?self.global, "Mux: composing global chain");
        self.global.then(Handler::from_service(self.table))
    }

    /// Finish construction and return a router ready for `axum::serve`
    pub fn into_router(self) -> axum::Router {
        axum::Router::new().fallback_service(self.into_handler())
    }
}

/// Scope with its own route chain over the dispatch table of its [`Mux`]
pub struct Group<'a> {
    table: &'a mut axum::Router,
    chain: Chain,
}

impl Group<'_> {
    /// Append decorators to this group only; the parent and siblings are unaffected.
    pub fn use_route(&mut self, decorators: impl IntoIterator<Item = Decorator>) -> &mut Self {
        self.chain.append(decorators);
        self
    }

    /// # Panics
    /// Panics if the pattern conflicts with an existing registration.
    pub fn handle(&mut self, pattern: &str, handler: Handler) -> &mut Self {
        register(&mut *self.table, &self.chain, pattern, handler);
        self
    }

    pub fn handle_fn<F, Fut>(&mut self, pattern: &str, f: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.handle(pattern, Handler::new(f))
    }

    /// Open a nested scope seeded with a copy of this group's chain
    pub fn group<F>(&mut self, configure: F) -> &mut Self
    where
        F: FnOnce(&mut Group<'_>),
    {
        let mut child = Group {
            table: &mut *self.table,
            chain: self.chain.clone(),
        };
        configure(&mut child);
        self
    }

    pub fn route_chain(&self) -> &Chain {
        &self.chain
    }
}

fn register(table: &mut axum::Router, chain: &Chain, pattern: &str, handler: Handler) {
    let (filter, path) = split_pattern(pattern);
    let composed = chain.then(handler);
    let method_router = match filter {
        Some(filter) => on_service(filter, composed),
        None => any_service(composed),
    };

    *table = std::mem::take(table).route(path, method_router);

    debug!(
        pattern = %pattern,
        decorators = ?chain.names(),
        "Mux: registered route"
    );
}

/// Split `"GET /path"` into a method filter and a path. Anything that does
/// not start with a known method is treated as a bare path.
fn split_pattern(pattern: &str) -> (Option<MethodFilter>, &str) {
    let Some((method, path)) = pattern.split_once(' ') else {
        return (None, pattern);
    };

    let filter = match method {
        "GET" => MethodFilter::GET,
        "POST" => MethodFilter::POST,
        "PUT" => MethodFilter::PUT,
        "PATCH" => MethodFilter::PATCH,
        "DELETE" => MethodFilter::DELETE,
        "HEAD" => MethodFilter::HEAD,
        "OPTIONS" => MethodFilter::OPTIONS,
        "TRACE" => MethodFilter::TRACE,
        _ => return (None, pattern),
    };

    (Some(filter), path.trim_start())
}
