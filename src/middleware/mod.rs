//! Ordered handler decorators and grouped routing
//!
//! A [`Decorator`] turns a [`Handler`] into another handler. A [`Chain`] of
//! decorators is composed outer-first: the first decorator's pre-logic runs
//! first and its post-logic runs last. [`Mux`] and [`Group`] attach chains to
//! routes, and a group copies its parent's chain when it is created.

pub mod chain;
pub mod decorators;
pub mod handler;
pub mod mux;

pub use chain::{Chain, Decorator};
pub use decorators::{log_request, recover_panic, set_response_header, track_metrics};
pub use handler::Handler;
pub use mux::{Group, Mux};
