/*
[INPUT]:  Scripted order book feeds under a paused clock
[OUTPUT]: Live watch termination and rendering verification
[POS]:    Integration test layer - time-bounded streaming
[UPDATE]: When changing watch termination or live update rendering
*/

mod common;

use std::time::Duration;

use common::{
    CollectingReporter, FeedEnd, FeedScript, MockFactory, book_update, config_with_credentials,
};
use kucoin_futures_demo::display::DisplayRecord;
use kucoin_futures_demo::{Session, Step, WatchOutcome};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn three_updates() -> Vec<kucoin_futures_demo::gateway::BookUpdate> {
    vec![
        book_update(&[("100.00", "1")], &[("100.50", "2")]),
        book_update(&[("100.10", "1"), ("100.00", "3")], &[("100.60", "2")]),
        book_update(&[], &[("100.70", "2")]),
    ]
}

async fn initialized(
    feed: FeedScript,
    shutdown: CancellationToken,
) -> (Session<MockFactory, CollectingReporter>, common::SharedLog) {
    let factory = MockFactory {
        feed,
        ..MockFactory::default()
    };
    let log = factory.log();
    let mut session = Session::new(
        config_with_credentials(),
        factory,
        CollectingReporter::default(),
        shutdown,
    );
    session.initialize().await.expect("initialize");
    (session, log)
}

#[tokio::test(start_paused = true)]
async fn test_cutoff_after_duration_with_all_updates() {
    let feed = FeedScript {
        updates: three_updates(),
        then: FeedEnd::Block,
        ..FeedScript::default()
    };
    let (mut session, log) = initialized(feed, CancellationToken::new()).await;

    let started = Instant::now();
    let outcome = session.watch_live("XBTUSDTM", Duration::from_secs(2)).await;
    let elapsed = started.elapsed();

    assert_eq!(outcome, WatchOutcome::TimedOut { updates: 3 });
    assert!(elapsed >= Duration::from_secs(2), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(2100), "returned late: {elapsed:?}");
    assert_eq!(session.reporter().live_updates().len(), 3);

    let log = log.lock().unwrap();
    assert_eq!(log.subscribed, 1);
    assert_eq!(log.unsubscribed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_live_update_rendering() {
    let feed = FeedScript {
        updates: three_updates(),
        ..FeedScript::default()
    };
    let (mut session, _log) = initialized(feed, CancellationToken::new()).await;

    session.watch_live("XBTUSDTM", Duration::from_secs(1)).await;

    let updates = session.reporter().live_updates();
    let DisplayRecord::LiveUpdate { sequence, top_bids, spread, .. } = updates[0] else {
        panic!("expected live update");
    };
    assert_eq!(*sequence, 1);
    assert_eq!(top_bids[0].price, "100.00");
    assert_eq!(spread.as_deref(), Some("0.50"));

    let DisplayRecord::LiveUpdate { sequence, top_bids, spread, .. } = updates[1] else {
        panic!("expected live update");
    };
    assert_eq!(*sequence, 2);
    assert_eq!(top_bids.len(), 2);
    assert_eq!(spread.as_deref(), Some("0.50"));

    let DisplayRecord::LiveUpdate { top_bids, spread, .. } = updates[2] else {
        panic!("expected live update");
    };
    assert!(top_bids.is_empty());
    assert_eq!(*spread, None);
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_ends_watch() {
    let shutdown = CancellationToken::new();
    let feed = FeedScript {
        updates: three_updates(),
        then: FeedEnd::Block,
        ..FeedScript::default()
    };
    let (mut session, log) = initialized(feed, shutdown.clone()).await;

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let outcome = session.watch_live("XBTUSDTM", Duration::from_secs(60)).await;

    assert_eq!(outcome, WatchOutcome::Interrupted { updates: 3 });
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(log.lock().unwrap().unsubscribed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_stream_error_ends_watch_without_propagating() {
    let feed = FeedScript {
        updates: three_updates()[..1].to_vec(),
        then: FeedEnd::Fail("connection reset".into()),
        ..FeedScript::default()
    };
    let (mut session, log) = initialized(feed, CancellationToken::new()).await;

    let outcome = session.watch_live("XBTUSDTM", Duration::from_secs(60)).await;

    match outcome {
        WatchOutcome::StreamFailed { updates, reason } => {
            assert_eq!(updates, 1);
            assert!(reason.contains("connection reset"), "reason: {reason}");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(log.lock().unwrap().unsubscribed, 0);
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_failure_is_stream_error() {
    let feed = FeedScript {
        subscribe_error: Some("bullet rejected".into()),
        ..FeedScript::default()
    };
    let (mut session, _log) = initialized(feed, CancellationToken::new()).await;

    let outcome = session.watch_live("XBTUSDTM", Duration::from_secs(2)).await;

    assert!(matches!(outcome, WatchOutcome::StreamFailed { updates: 0, .. }));
    assert!(session.reporter().live_updates().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stream_failure_still_reaches_cleanup() {
    let factory = MockFactory {
        feed: FeedScript {
            then: FeedEnd::Fail("closed".into()),
            ..FeedScript::default()
        },
        ..MockFactory::default()
    };
    let log = factory.log();
    let mut session = Session::new(
        config_with_credentials(),
        factory,
        CollectingReporter::default(),
        CancellationToken::new(),
    );

    let report = session.run().await;

    assert!(report.is_success());
    assert!(matches!(report.watch, Some(WatchOutcome::StreamFailed { .. })));
    assert!(report.status(Step::WatchLive).is_some());
    let log = log.lock().unwrap();
    assert_eq!(log.feed_closed, 1);
    assert_eq!(log.gateway_closed, 1);
}

#[tokio::test]
async fn test_watch_before_initialize_fails_softly() {
    let mut session = Session::new(
        config_with_credentials(),
        MockFactory::default(),
        CollectingReporter::default(),
        CancellationToken::new(),
    );

    let outcome = session.watch_live("XBTUSDTM", Duration::from_secs(1)).await;
    assert!(matches!(outcome, WatchOutcome::StreamFailed { updates: 0, .. }));
}
