//! Consumer side of a heartbeat worker

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::error;

/// Best-effort liveness notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    /// Attempt number, counting dropped pulses too; gaps mean drops
    pub seq: u64,
    pub emitted_at: DateTime<Utc>,
}

/// What a consumer observes next on a worker's streams
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<T> {
    Pulse(Pulse),
    Result(T),
    /// Both streams are closed; the worker has terminated
    Closed,
}

impl<T> Event<T> {
    pub fn is_closed(&self) -> bool {
        matches!(self, Event::Closed)
    }
}

/// Owns the pulse and result streams of a running worker
pub struct WorkerHandle<T> {
    pulses: mpsc::Receiver<Pulse>,
    results: mpsc::Receiver<T>,
    pulses_open: bool,
    results_open: bool,
    join: JoinHandle<()>,
}

impl<T> WorkerHandle<T> {
    pub(crate) fn new(
        pulses: mpsc::Receiver<Pulse>,
        results: mpsc::Receiver<T>,
        join: JoinHandle<()>,
    ) -> Self {
        Self {
            pulses,
            results,
            pulses_open: true,
            results_open: true,
            join,
        }
    }

    /// Wait for the next pulse or result.
    ///
    /// Returns [`Event::Closed`] once both streams are closed and drained, and
    /// keeps returning it on every later call. Cancel-safe.
    pub async fn next_event(&mut self) -> Event<T> {
        loop {
            tokio::select! {
                result = self.results.recv(), if self.results_open => match result {
                    Some(value) => return Event::Result(value),
                    None => self.results_open = false,
                },
                pulse = self.pulses.recv(), if self.pulses_open => match pulse {
                    Some(pulse) => return Event::Pulse(pulse),
                    None => self.pulses_open = false,
                },
                else => return Event::Closed,
            }
        }
    }

    /// Like [`next_event`](Self::next_event), but gives up after `timeout`.
    /// `None` means the worker went silent for longer than expected.
    pub async fn next_event_within(&mut self, timeout: Duration) -> Option<Event<T>> {
        tokio::time::timeout(timeout, self.next_event()).await.ok()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Split into the raw `(pulses, results)` streams and the task handle
    pub fn into_parts(self) -> (mpsc::Receiver<Pulse>, mpsc::Receiver<T>, JoinHandle<()>) {
        (self.pulses, self.results, self.join)
    }

    /// Drop both streams and wait for the worker task to end.
    ///
    /// Without cancellation the worker notices the dropped result stream at its
    /// next work tick.
    pub async fn join(self) {
        let Self { join, .. } = self;
        if let Err(e) = join.await {
            if e.is_panic() {
                error!(error = %e, "Heartbeat: worker task panicked");
            }
        }
    }
}
