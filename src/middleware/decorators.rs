//! Stock decorators

use super::chain::Decorator;
use super::handler::Handler;
use crate::metrics::Metrics;
use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Turn a panic anywhere inside the wrapped handler into a 500 response.
///
/// Only protects what it wraps, so register it first (outermost).
pub fn recover_panic() -> Decorator {
    Decorator::from_fn("recover_panic", |req: Request, next: Handler| async move {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        match AssertUnwindSafe(async move { next.run(req).await })
            .catch_unwind()
            .await
        {
            Ok(response) => response,
            Err(panic) => {
                error!(
                    method = %method,
                    path = %path,
                    panic = %panic_message(panic.as_ref()),
                    "Handler panicked"
                );
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Log method, path, status and latency of every request
pub fn log_request() -> Decorator {
    Decorator::from_fn("log_request", |req: Request, next: Handler| async move {
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let response = next.run(req).await;
        let status = response.status();
        let duration_ms = start.elapsed().as_millis() as u64;

        if status.is_server_error() {
            error!(
                method = %method,
                path = %path,
                status = %status,
                duration_ms,
                "HTTP request error"
            );
        } else {
            info!(
                method = %method,
                path = %path,
                status = %status,
                duration_ms,
                "HTTP request"
            );
        }

        response
    })
}

/// Track in-flight requests, request count and latency
pub fn track_metrics(metrics: Arc<Metrics>) -> Decorator {
    Decorator::from_fn("track_metrics", move |req: Request, next: Handler| {
        let metrics = metrics.clone();
        async move {
            let start = Instant::now();
            let _in_flight = InFlight::enter(&metrics);

            let response = next.run(req).await;

            metrics.http_requests_total.inc();
            metrics
                .http_request_duration_seconds
                .observe(start.elapsed().as_secs_f64());
            response
        }
    })
}

/// Keeps the in-flight gauge honest even when the inner handler unwinds
struct InFlight<'a>(&'a Metrics);

impl<'a> InFlight<'a> {
    fn enter(metrics: &'a Metrics) -> Self {
        metrics.http_requests_in_flight.inc();
        Self(metrics)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.http_requests_in_flight.dec();
    }
}

/// Insert `name: value` into every response, replacing any existing value
pub fn set_response_header(name: HeaderName, value: HeaderValue) -> Decorator {
    let label = format!("set_response_header({name})");
    Decorator::from_fn(label, move |req: Request, next: Handler| {
        let name = name.clone();
        let value = value.clone();
        async move {
            let mut response = next.run(req).await;
            response.headers_mut().insert(name, value);
            response
        }
    })
}
