//! Unit tests for the heartbeat worker

use heartmux::heartbeat::{self, CancellationToken, Event, Heartbeat};
use heartmux::metrics::Metrics;
use std::sync::Arc;
use tokio::time::{sleep, timeout, timeout_at, Duration, Instant};

const INTERVAL: Duration = Duration::from_millis(100);
const EPSILON: Duration = Duration::from_millis(10);

#[tokio::test(start_paused = true)]
async fn test_emits_pulses_and_result_within_three_intervals() {
    let token = CancellationToken::new();
    let mut handle = heartbeat::start(token.clone(), INTERVAL);

    let deadline = Instant::now() + INTERVAL * 3 + EPSILON;
    let (mut pulses, mut results) = (0, 0);
    while let Ok(event) = timeout_at(deadline, handle.next_event()).await {
        match event {
            Event::Pulse(_) => pulses += 1,
            Event::Result(_) => results += 1,
            Event::Closed => break,
        }
    }

    assert!(results >= 1, "expected at least one result, got {results}");
    assert!(pulses >= 2, "expected at least two pulses, got {pulses}");
    token.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_ten_intervals_yield_ten_pulses_and_three_results() {
    let token = CancellationToken::new();
    let mut handle = heartbeat::start(token.clone(), INTERVAL);

    let deadline = Instant::now() + INTERVAL * 10 + EPSILON;
    let mut pulse_seqs = Vec::new();
    let mut results = 0;
    while let Ok(event) = timeout_at(deadline, handle.next_event()).await {
        match event {
            Event::Pulse(pulse) => pulse_seqs.push(pulse.seq),
            Event::Result(_) => results += 1,
            Event::Closed => break,
        }
    }

    assert_eq!(pulse_seqs, (1..=10).collect::<Vec<u64>>());
    assert_eq!(results, 3);
    token.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_closes_both_streams_within_one_interval() {
    let token = CancellationToken::new();
    let mut handle = heartbeat::start(token.clone(), INTERVAL);

    sleep(INTERVAL * 2 + Duration::from_millis(50)).await;
    token.cancel();
    let cancelled_at = Instant::now();

    loop {
        let event = timeout(INTERVAL, handle.next_event())
            .await
            .expect("streams should close within one interval of cancellation");
        if event.is_closed() {
            break;
        }
    }
    assert!(cancelled_at.elapsed() <= INTERVAL);

    // Closure is terminal
    assert_eq!(handle.next_event().await, Event::Closed);
    sleep(INTERVAL * 5).await;
    assert_eq!(handle.next_event().await, Event::Closed);
    assert!(handle.is_finished());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_abandons_pending_result() {
    let token = CancellationToken::new();
    let handle = heartbeat::start(token.clone(), INTERVAL);
    let (mut pulses, mut results, join) = handle.into_parts();

    // First result fills the result slot at 3 intervals; the second is still
    // waiting for a reader when the token fires.
    sleep(INTERVAL * 6 + Duration::from_millis(50)).await;
    token.cancel();
    join.await.expect("worker task should finish cleanly");

    assert!(results.recv().await.is_some());
    assert!(results.recv().await.is_none());

    assert!(pulses.recv().await.is_some());
    assert!(pulses.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_pulses_are_dropped_when_nobody_listens() {
    let metrics = Arc::new(Metrics::new().expect("metrics initialization"));
    let token = CancellationToken::new();
    let handle = Heartbeat::new(INTERVAL)
        .with_metrics(metrics.clone())
        .spawn(token.clone(), || ());
    let (mut pulses, _results, join) = handle.into_parts();

    sleep(INTERVAL * 5 + Duration::from_millis(50)).await;
    token.cancel();
    join.await.expect("worker task should finish cleanly");

    let mut seqs = Vec::new();
    while let Some(pulse) = pulses.recv().await {
        seqs.push(pulse.seq);
    }

    assert_eq!(seqs, vec![1]);
    assert_eq!(metrics.heartbeat_pulses_sent_total.get(), 1);
    assert_eq!(metrics.heartbeat_pulses_dropped_total.get(), 4);
    assert_eq!(metrics.heartbeat_results_delivered_total.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_pending_result_does_not_starve_pulses() {
    let token = CancellationToken::new();
    let handle = heartbeat::start(token.clone(), INTERVAL);
    // Results are never read, so from the second work tick on a delivery is
    // always pending.
    let (mut pulses, _results, _join) = handle.into_parts();

    let deadline = Instant::now() + INTERVAL * 10 + EPSILON;
    let mut seqs = Vec::new();
    while let Ok(Some(pulse)) = timeout_at(deadline, pulses.recv()).await {
        seqs.push(pulse.seq);
    }

    assert_eq!(seqs, (1..=10).collect::<Vec<u64>>());
    token.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_dropping_result_stream_stops_worker() {
    let token = CancellationToken::new();
    let handle = heartbeat::start(token.clone(), INTERVAL);
    let (mut pulses, results, join) = handle.into_parts();
    drop(results);

    // Worker notices at the first work tick.
    sleep(INTERVAL * 3 + EPSILON).await;
    join.await.expect("worker task should finish cleanly");
    assert!(!token.is_cancelled());

    while pulses.recv().await.is_some() {}
}

#[tokio::test(start_paused = true)]
async fn test_custom_work_and_multiplier() {
    let token = CancellationToken::new();
    let mut counter = 0u32;
    let mut handle = Heartbeat::new(INTERVAL)
        .with_work_multiplier(2)
        .spawn(token.clone(), move || {
            counter += 1;
            counter
        });

    let deadline = Instant::now() + INTERVAL * 4 + EPSILON;
    let mut results = Vec::new();
    while let Ok(event) = timeout_at(deadline, handle.next_event()).await {
        if let Event::Result(value) = event {
            results.push(value);
        }
    }

    assert_eq!(results, vec![1, 2]);
    token.cancel();
    handle.join().await;
}

#[test]
fn test_builder_intervals() {
    let heartbeat = Heartbeat::new(INTERVAL);
    assert_eq!(heartbeat.pulse_interval(), INTERVAL);
    assert_eq!(heartbeat.work_interval(), INTERVAL * 3);

    let heartbeat = heartbeat.with_work_multiplier(0);
    assert_eq!(heartbeat.work_interval(), INTERVAL);
}

#[tokio::test]
#[should_panic(expected = "non-zero")]
async fn test_zero_interval_panics() {
    let _ = heartbeat::start(CancellationToken::new(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_token_cancelled_before_start_closes_immediately() {
    let token = CancellationToken::new();
    token.cancel();
    let mut handle = heartbeat::start(token, INTERVAL);

    let event = timeout(INTERVAL, handle.next_event())
        .await
        .expect("already-cancelled worker should close at once");
    assert_eq!(event, Event::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_huge_interval_stays_quiet_and_cancels() {
    let token = CancellationToken::new();
    let heartbeat = Heartbeat::new(Duration::from_secs(u64::MAX / 2));
    assert_eq!(heartbeat.work_interval(), Duration::MAX);

    let mut handle = heartbeat.spawn(token.clone(), || ());
    assert!(timeout(INTERVAL, handle.next_event()).await.is_err());

    token.cancel();
    let event = timeout(INTERVAL, handle.next_event())
        .await
        .expect("cancelled worker should close");
    assert_eq!(event, Event::Closed);
}
