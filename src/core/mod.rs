//! Core application primitives (HTTP server, heartbeat runtime)

pub mod http;
pub mod runtime;

pub use http::*;
pub use runtime::*;
