//! Heartbeat runtime: one worker and a monitor that consumes its streams

use crate::config::HeartbeatConfig;
use crate::heartbeat::{Event, Heartbeat, WorkerHandle};
use crate::metrics::Metrics;
use chrono::Utc;
use std::fmt::Debug;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What the monitor observed before the worker's streams closed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeReport {
    pub pulses: u64,
    pub results: u64,
    /// Waits that hit the monitor timeout without any event
    pub stalls: u64,
}

pub struct HeartbeatRuntime {
    config: HeartbeatConfig,
    metrics: Option<Arc<Metrics>>,
}

impl HeartbeatRuntime {
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &HeartbeatConfig {
        &self.config
    }

    /// Worker builder configured from this runtime
    pub fn heartbeat(&self) -> Heartbeat {
        let heartbeat = Heartbeat::new(self.config.pulse_interval)
            .with_work_multiplier(self.config.work_multiplier);
        match &self.metrics {
            Some(metrics) => heartbeat.with_metrics(metrics.clone()),
            None => heartbeat,
        }
    }

    /// Run a timestamp-producing worker until `token` is cancelled
    pub async fn run(&self, token: CancellationToken) -> RuntimeReport {
        let handle = self.heartbeat().spawn(token, Utc::now);
        self.monitor(handle).await
    }

    /// Consume `handle` until both of its streams close
    pub async fn monitor<T: Debug>(&self, mut handle: WorkerHandle<T>) -> RuntimeReport {
        let mut report = RuntimeReport::default();
        let timeout = self.config.monitor_timeout;

        info!(
            pulse_interval_ms = self.config.pulse_interval.as_millis() as u64,
            timeout_ms = timeout.as_millis() as u64,
            "HeartbeatRuntime: monitoring worker"
        );

        loop {
            match handle.next_event_within(timeout).await {
                Some(Event::Pulse(pulse)) => {
                    report.pulses += 1;
                    debug!(seq = pulse.seq, "HeartbeatRuntime: pulse");
                }
                Some(Event::Result(result)) => {
                    report.results += 1;
                    info!(result = ?result, "HeartbeatRuntime: result received");
                }
                Some(Event::Closed) => break,
                None => {
                    report.stalls += 1;
                    warn!(
                        timeout_ms = timeout.as_millis() as u64,
                        "HeartbeatRuntime: no pulse within timeout, worker may be unhealthy"
                    );
                }
            }
        }

        handle.join().await;
        info!(
            pulses = report.pulses,
            results = report.results,
            stalls = report.stalls,
            "HeartbeatRuntime: worker streams closed"
        );
        report
    }
}
