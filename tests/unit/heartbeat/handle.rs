//! Unit tests for the worker handle

use heartmux::heartbeat::{self, CancellationToken, Event};
use tokio::time::{sleep, Duration};
use tokio_test::{assert_pending, assert_ready};

const INTERVAL: Duration = Duration::from_millis(100);

#[tokio::test(start_paused = true)]
async fn test_next_event_waits_for_first_pulse() {
    let token = CancellationToken::new();
    let mut handle = heartbeat::start(token.clone(), INTERVAL);

    {
        let mut next = tokio_test::task::spawn(handle.next_event());
        assert_pending!(next.poll());

        sleep(INTERVAL + Duration::from_millis(1)).await;
        assert!(next.is_woken());
        let event = assert_ready!(next.poll());
        assert!(matches!(event, Event::Pulse(pulse) if pulse.seq == 1));
    }

    token.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_next_event_within_reports_silence() {
    let token = CancellationToken::new();
    let mut handle = heartbeat::start(token.clone(), INTERVAL);

    assert!(handle
        .next_event_within(Duration::from_millis(50))
        .await
        .is_none());

    let event = handle
        .next_event_within(INTERVAL)
        .await
        .expect("a pulse should arrive within one interval");
    assert!(matches!(event, Event::Pulse(_)));

    token.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_join_after_cancel() {
    let token = CancellationToken::new();
    let handle = heartbeat::start(token.clone(), INTERVAL);
    assert!(!handle.is_finished());

    token.cancel();
    handle.join().await;
}

#[test]
fn test_event_is_closed() {
    assert!(Event::<()>::Closed.is_closed());
    assert!(!Event::Result(1).is_closed());
}
