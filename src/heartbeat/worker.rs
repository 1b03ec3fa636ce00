//! Worker task that emits liveness pulses alongside periodic work results

use super::handle::{Pulse, WorkerHandle};
use crate::metrics::Metrics;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

pub const DEFAULT_WORK_MULTIPLIER: u32 = 3;

/// Start a worker that pulses every `pulse_interval` and produces the current
/// timestamp as its unit of work every three intervals.
///
/// Both streams of the returned handle close once `token` is cancelled.
///
/// # Panics
/// Panics if `pulse_interval` is zero or if called outside a tokio runtime.
pub fn start(token: CancellationToken, pulse_interval: Duration) -> WorkerHandle<DateTime<Utc>> {
    Heartbeat::new(pulse_interval).spawn(token, Utc::now)
}

/// Builder for a heartbeat worker
#[derive(Clone)]
pub struct Heartbeat {
    pulse_interval: Duration,
    work_multiplier: u32,
    metrics: Option<Arc<Metrics>>,
}

impl Heartbeat {
    pub fn new(pulse_interval: Duration) -> Self {
        Self {
            pulse_interval,
            work_multiplier: DEFAULT_WORK_MULTIPLIER,
            metrics: None,
        }
    }

    /// Produce one result every `multiplier` pulse intervals (minimum 1)
    pub fn with_work_multiplier(mut self, multiplier: u32) -> Self {
        self.work_multiplier = multiplier.max(1);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn pulse_interval(&self) -> Duration {
        self.pulse_interval
    }

    pub fn work_interval(&self) -> Duration {
        self.pulse_interval
            .checked_mul(self.work_multiplier)
            .unwrap_or(Duration::MAX)
    }

    /// Spawn the worker on the current runtime. `work` is called once per work
    /// tick and its output is delivered on the result stream.
    ///
    /// # Panics
    /// Panics if the pulse interval is zero or if called outside a tokio runtime.
    pub fn spawn<T, F>(self, token: CancellationToken, work: F) -> WorkerHandle<T>
    where
        T: Send + 'static,
        F: FnMut() -> T + Send + 'static,
    {
        assert!(
            !self.pulse_interval.is_zero(),
            "heartbeat pulse interval must be non-zero"
        );

        let (pulse_tx, pulse_rx) = mpsc::channel(1);
        let (result_tx, result_rx) = mpsc::channel(1);

        let now = Instant::now();
        let emitter = Emitter {
            token,
            pulses: Pulser {
                tx: pulse_tx,
                ticker: ticker(now, self.pulse_interval),
                metrics: self.metrics.clone(),
                attempted: 0,
            },
            result_tx,
            work: ticker(now, self.work_interval()),
            metrics: self.metrics,
        };

        debug!(
            pulse_interval_ms = self.pulse_interval.as_millis() as u64,
            work_multiplier = self.work_multiplier,
            "Heartbeat: spawning worker"
        );

        let join = tokio::spawn(emitter.run(work));
        WorkerHandle::new(pulse_rx, result_rx, join)
    }
}

/// Deadline used when a period is too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// First tick lands one full period after `start`; late ticks are skipped.
fn ticker(start: Instant, period: Duration) -> Interval {
    let first = start
        .checked_add(period)
        .unwrap_or_else(|| start + FAR_FUTURE);
    let mut ticker = interval_at(first, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

struct Emitter<T> {
    token: CancellationToken,
    pulses: Pulser,
    result_tx: mpsc::Sender<T>,
    work: Interval,
    metrics: Option<Arc<Metrics>>,
}

/// Pulse side of the emitter. Borrowed separately from `result_tx` while a
/// result reservation is pending.
struct Pulser {
    tx: mpsc::Sender<Pulse>,
    ticker: Interval,
    metrics: Option<Arc<Metrics>>,
    attempted: u64,
}

impl Pulser {
    fn send(&mut self) {
        self.attempted += 1;
        let pulse = Pulse {
            seq: self.attempted,
            emitted_at: Utc::now(),
        };

        match self.tx.try_send(pulse) {
            Ok(()) => {
                if let Some(metrics) = &self.metrics {
                    metrics.heartbeat_pulses_sent_total.inc();
                }
            }
            Err(TrySendError::Full(pulse)) | Err(TrySendError::Closed(pulse)) => {
                trace!(seq = pulse.seq, "Heartbeat: no listener, pulse dropped");
                if let Some(metrics) = &self.metrics {
                    metrics.heartbeat_pulses_dropped_total.inc();
                }
            }
        }
    }
}

impl<T: Send + 'static> Emitter<T> {
    async fn run<F>(mut self, mut work: F)
    where
        F: FnMut() -> T + Send + 'static,
    {
        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                _ = self.pulses.ticker.tick() => self.pulses.send(),
                _ = self.work.tick() => {
                    let value = work();
                    if !self.deliver(value).await {
                        break;
                    }
                }
            }
        }

        // Senders drop with `self`, which closes both streams.
        debug!(
            pulses_attempted = self.pulses.attempted,
            cancelled = self.token.is_cancelled(),
            "Heartbeat: worker stopped, closing streams"
        );
    }

    /// Wait for the consumer to take `value`, pulsing in the meantime.
    /// Returns false when the worker should stop.
    async fn deliver(&mut self, value: T) -> bool {
        let Self {
            token,
            pulses,
            result_tx,
            metrics,
            ..
        } = self;

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => return false,
                permit = result_tx.reserve() => {
                    return match permit {
                        Ok(permit) => {
                            permit.send(value);
                            if let Some(metrics) = metrics.as_ref() {
                                metrics.heartbeat_results_delivered_total.inc();
                            }
                            true
                        }
                        Err(_) => {
                            debug!("Heartbeat: result receiver dropped, stopping worker");
                            false
                        }
                    };
                }
                _ = pulses.ticker.tick() => pulses.send(),
            }
        }
    }
}
