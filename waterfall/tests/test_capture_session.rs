use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use waterfall::capture::{CaptureSession, ChannelProvider, OwnedRecord};
use waterfall::domain::{AllocationEvent, SessionError, SessionState};
use waterfall::model::WaterfallModel;
use waterfall_common::OPCODE_HEAP_FREE;

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

const MS: u64 = 1_000_000;

#[test]
fn test_second_start_is_a_noop() {
    let (provider, _feeder) = ChannelProvider::new();
    let gauge = provider.session_gauge();
    let session = CaptureSession::new(provider);

    session.start().expect("first start");
    session.start().expect("second start while running");

    assert_eq!(session.state(), SessionState::Running);
    assert_eq!(gauge.open_sessions(), 1, "only one provider session may be open");

    session.stop();
    assert_eq!(gauge.open_sessions(), 0);
}

#[test]
fn test_racing_starts_open_one_session() {
    let (provider, _feeder) = ChannelProvider::new();
    let gauge = provider.session_gauge();
    let session = Arc::new(CaptureSession::new(provider));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let session = Arc::clone(&session);
            thread::spawn(move || session.start())
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(results.iter().all(Result::is_ok), "{results:?}");
    assert!(session.is_running());
    assert_eq!(gauge.open_sessions(), 1);
}

#[test]
fn test_failed_start_reports_error_and_releases_session() {
    let (provider, _feeder) = ChannelProvider::new();
    let provider =
        provider.fail_start_with(SessionError::PermissionDenied("requires root".to_string()));
    let gauge = provider.session_gauge();
    let session = CaptureSession::new(provider);

    let err = session.start().unwrap_err();
    assert_eq!(err, SessionError::PermissionDenied("requires root".to_string()));
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(gauge.open_sessions(), 0);
    assert_eq!(session.elapsed_time_ms(), 0.0);
}

#[test]
fn test_non_allocation_records_are_filtered() {
    let (provider, feeder) = ChannelProvider::new();
    let session = CaptureSession::new(provider);
    session.start().unwrap();

    feeder.send(OwnedRecord::alloc(0, 64).with_opcode(OPCODE_HEAP_FREE));
    feeder.send_alloc(MS, 32);
    feeder.send(OwnedRecord::alloc(2 * MS, 0).with_payload(vec![1, 2]));

    assert!(wait_for(|| session.stats().records_seen == 3));
    let stats = session.stats();
    assert_eq!(stats.records_filtered, 1);
    assert_eq!(stats.decode_failures, 1);
    assert_eq!(stats.events_appended, 2);

    // Time zero comes from the first *accepted* record
    let events = session.snapshot(f64::MAX);
    assert_eq!(events, vec![AllocationEvent::new(0.0, 32), AllocationEvent::new(1.0, 1)]);
}

#[test]
fn test_events_survive_stop_and_clear_on_restart() {
    let (provider, feeder) = ChannelProvider::new();
    let session = CaptureSession::new(provider);
    session.start().unwrap();

    feeder.send_alloc(0, 8);
    feeder.send_alloc(MS, 16);
    assert!(wait_for(|| session.stats().events_appended == 2));

    session.stop();
    assert_eq!(session.snapshot(f64::MAX).len(), 2);
    assert_eq!(session.elapsed_time_ms(), 0.0);

    // Queued while stopped; never part of the next capture
    feeder.send_alloc(2 * MS, 32);

    session.start().unwrap();
    assert!(session.snapshot(f64::MAX).is_empty());
    assert_eq!(session.stats(), Default::default());

    feeder.send_alloc(7 * MS, 64);
    assert!(wait_for(|| session.stats().events_appended == 1));
    assert_eq!(session.snapshot(f64::MAX), vec![AllocationEvent::new(0.0, 64)]);
    assert_eq!(session.stats().records_seen, 1);
}

#[test]
fn test_snapshot_is_consistent_while_feeding() {
    const TOTAL: u64 = 20_000;
    const MAX_AGE_MS: f64 = 50.0;

    // Record i carries size i so a snapshot identifies how far ingestion got
    #[allow(clippy::cast_precision_loss)]
    fn fed_event(i: u64) -> AllocationEvent {
        AllocationEvent::new((i * 10_000) as f64 / 1_000_000.0, i)
    }

    let (provider, feeder) = ChannelProvider::new();
    let session = Arc::new(CaptureSession::new(provider));
    session.start().unwrap();

    let producer = thread::spawn(move || {
        for i in 0..TOTAL {
            feeder.send_alloc(i * 10_000, i);
        }
    });

    let mut checked = 0;
    while !producer.is_finished() || checked == 0 {
        let events = session.snapshot(MAX_AGE_MS);
        let Some(last) = events.last() else { continue };

        let latest = last.elapsed_ms;
        let expected: Vec<_> = (0..=last.size_bytes)
            .map(fed_event)
            .filter(|e| e.elapsed_ms >= latest - MAX_AGE_MS)
            .collect();
        assert_eq!(events, expected, "snapshot must be the exact tail of what was ingested");
        checked += 1;
    }
    producer.join().unwrap();

    assert!(wait_for(|| session.stats().events_appended == TOTAL));
    let events = session.snapshot(f64::MAX);
    assert_eq!(events.len() as u64 + session.stats().events_trimmed, TOTAL);
}

#[test]
fn test_trim_never_drops_events_inside_the_window() {
    let (provider, feeder) = ChannelProvider::new();
    let session = CaptureSession::with_trim_watermark(provider, 2);
    session.start().unwrap();

    for i in 0..10 {
        feeder.send_alloc(i * MS, 64);
    }
    assert!(wait_for(|| session.stats().events_appended == 10));

    let first = session.snapshot(3.0);
    let times: Vec<f64> = first.iter().map(|e| e.elapsed_ms).collect();
    assert_eq!(times, vec![6.0, 7.0, 8.0, 9.0]);

    let stats = session.stats();
    assert_eq!(stats.events_trimmed, 6);
    assert_eq!(stats.buffered, 4);
    assert_eq!(session.snapshot(3.0), first);
}

#[test]
fn test_model_polls_running_session() {
    let (provider, feeder) = ChannelProvider::new();
    let session = CaptureSession::new(provider);
    session.start().unwrap();

    feeder.send_alloc(0, 100);
    assert!(wait_for(|| session.stats().events_appended == 1));

    let mut model = WaterfallModel::default();
    model.poll(&session);
    assert!(model.events().is_empty(), "static model ignores live data");

    model.set_live_mode(true);
    model.poll(&session);
    assert_eq!(model.events(), &[AllocationEvent::new(0.0, 100)]);
    assert!(model.current_time_ms() >= 0.0);

    let aggregate = model.refresh(std::num::NonZeroUsize::new(100).unwrap());
    let window = aggregate.window.expect("live pass always has a window");
    assert!(window.end_ms - window.start_ms <= 30_000.0);
}
