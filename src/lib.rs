//! Liveness-signalling workers and grouped HTTP decorator chains

pub mod config;
pub mod core;
pub mod heartbeat;
pub mod logging;
pub mod metrics;
pub mod middleware;
