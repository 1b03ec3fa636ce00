//! Decorators and ordered decorator chains

use super::handler::Handler;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use std::borrow::Cow;
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tower::{Layer, Service};

type WrapFn = dyn Fn(Handler) -> Handler + Send + Sync;

/// Wraps a handler with behaviour that runs before and after it.
///
/// Two decorators are equal only when they are clones of the same value.
#[derive(Clone)]
pub struct Decorator {
    name: Cow<'static, str>,
    wrap: Arc<WrapFn>,
}

impl Decorator {
    pub fn new<F>(name: impl Into<Cow<'static, str>>, wrap: F) -> Self
    where
        F: Fn(Handler) -> Handler + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            wrap: Arc::new(wrap),
        }
    }

    /// Build a decorator from an async function receiving the request and
    /// the next handler, in the style of `axum::middleware::from_fn`.
    ///
    /// ```ignore
    /// let timing = Decorator::from_fn("timing", |req, next: Handler| async move {
    ///     let start = Instant::now();
    ///     let response = next.run(req).await;
    ///     tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "done");
    ///     response
    /// });
    /// ```
    pub fn from_fn<F, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(Request, Handler) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self::new(name, move |next: Handler| {
            let f = f.clone();
            Handler::new(move |req| f(req, next.clone()))
        })
    }

    /// Use a tower layer (`TraceLayer`, `CorsLayer`, ...) as a decorator
    pub fn from_layer<L>(name: impl Into<Cow<'static, str>>, layer: L) -> Self
    where
        L: Layer<Handler> + Send + Sync + 'static,
        L::Service: Service<Request, Error = Infallible> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request>>::Response: IntoResponse,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        Self::new(name, move |next| Handler::from_service(layer.layer(next)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wrap `handler`, returning the decorated handler
    pub fn wrap(&self, handler: Handler) -> Handler {
        (self.wrap)(handler)
    }
}

impl PartialEq for Decorator {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.wrap, &other.wrap)
    }
}

impl Eq for Decorator {}

impl fmt::Debug for Decorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Decorator").field(&self.name).finish()
    }
}

/// Ordered decorator sequence; the first decorator is the outermost wrapper.
///
/// Cloning copies the sequence, so a clone can be extended without the
/// original ever observing it.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Chain {
    decorators: Vec<Decorator>,
}

impl Chain {
    pub fn new(decorators: impl IntoIterator<Item = Decorator>) -> Self {
        Self {
            decorators: decorators.into_iter().collect(),
        }
    }

    /// New chain made of this one followed by `decorators`; `self` is untouched
    #[must_use]
    pub fn extend(&self, decorators: impl IntoIterator<Item = Decorator>) -> Chain {
        let mut extended = self.clone();
        extended.append(decorators);
        extended
    }

    pub fn append(&mut self, decorators: impl IntoIterator<Item = Decorator>) {
        self.decorators.extend(decorators);
    }

    /// Compose the chain around `handler`: `[d1, d2, d3]` yields `d1(d2(d3(h)))`.
    pub fn then(&self, handler: Handler) -> Handler {
        self.decorators
            .iter()
            .rev()
            .fold(handler, |inner, decorator| decorator.wrap(inner))
    }

    pub fn then_fn<F, Fut>(&self, f: F) -> Handler
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.then(Handler::new(f))
    }

    pub fn len(&self) -> usize {
        self.decorators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decorators.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decorator> {
        self.decorators.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.decorators.iter().map(Decorator::name).collect()
    }
}

impl FromIterator<Decorator> for Chain {
    fn from_iter<I: IntoIterator<Item = Decorator>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
