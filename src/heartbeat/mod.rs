//! Liveness signalling for long-running workers
//!
//! A worker emits a pulse every interval on a channel that drops the pulse when
//! nobody is listening, and delivers a work result every few intervals on a
//! channel that never drops. Cancelling the caller's token closes both
//! streams, and closure is the only shutdown notice consumers get.

pub mod handle;
pub mod worker;

pub use handle::{Event, Pulse, WorkerHandle};
pub use tokio_util::sync::CancellationToken;
pub use worker::{start, Heartbeat, DEFAULT_WORK_MULTIPLIER};
