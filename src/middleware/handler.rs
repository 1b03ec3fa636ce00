//! Type-erased request handler shared by routes and decorators

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use futures_util::future::{BoxFuture, FutureExt};
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Service, ServiceExt};

type HandlerFn = dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync;

/// A cheaply cloneable async function from request to response.
///
/// Implements [`tower::Service`] so it can be mounted on an [`axum::Router`].
#[derive(Clone)]
pub struct Handler {
    inner: Arc<HandlerFn>,
}

impl Handler {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |req: Request| f(req).boxed()),
        }
    }

    /// Adapt any infallible tower service, e.g. an [`axum::Router`] or a
    /// [`MethodRouter`](axum::routing::MethodRouter).
    pub fn from_service<S>(service: S) -> Self
    where
        S: Service<Request, Error = Infallible> + Clone + Send + Sync + 'static,
        S::Response: IntoResponse,
        S::Future: Send + 'static,
    {
        Self::new(move |req| {
            let service = service.clone();
            async move {
                match service.oneshot(req).await {
                    Ok(response) => response.into_response(),
                    Err(never) => match never {},
                }
            }
        })
    }

    /// Adapt a plain axum handler function (extractors included)
    pub fn from_handler<H, T>(handler: H) -> Self
    where
        H: axum::handler::Handler<T, ()> + Sync,
        T: 'static,
    {
        Self::from_service(handler.with_state(()))
    }

    /// Adapt an axum handler that extracts `State<S>`
    pub fn from_stateful_handler<H, T, S>(handler: H, state: S) -> Self
    where
        H: axum::handler::Handler<T, S> + Sync,
        T: 'static,
        S: Clone + Send + Sync + 'static,
    {
        Self::from_service(handler.with_state(state))
    }

    /// Serve one request
    pub fn run(&self, req: Request) -> BoxFuture<'static, Response> {
        (self.inner)(req)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}

impl Service<Request> for Handler {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        self.run(req).map(Ok).boxed()
    }
}
