use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tradier::{EventKind, EventStreamReader, MAX_RECORD_BYTES, TradierError};
use tradier_mock::{line_source, stream_feed};

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn end_of_stream_closes_channel_without_stop() {
    let (tx, mut rx) = mpsc::channel(16);
    let reader = EventStreamReader::spawn(
        line_source(&[
            r#"{"type":"quote","symbol":"AAPL"}"#,
            "",
            r#"{"type":"trade","symbol":"MSFT"}"#,
        ]),
        tx,
    );

    let first = rx.recv().await.expect("first record");
    assert_eq!(first.event_kind(), EventKind::Quote);
    let second = rx.recv().await.expect("blank line skipped");
    assert_eq!(second.symbol, "MSFT");
    assert!(rx.recv().await.is_none());

    assert!(!reader.is_stopped());
    timeout(WAIT, reader.wait()).await.expect("reader exits");
}

#[tokio::test]
async fn records_arrive_in_source_order() {
    let lines: Vec<String> = (0..200)
        .map(|i| format!(r#"{{"type":"trade","symbol":"S{i}"}}"#))
        .collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    // small buffer forces the reader to wait on the consumer
    let (tx, mut rx) = mpsc::channel(2);
    let _reader = EventStreamReader::spawn(line_source(&refs), tx);

    let mut got = Vec::new();
    while let Some(env) = rx.recv().await {
        got.push(env.symbol);
    }
    let want: Vec<String> = (0..200).map(|i| format!("S{i}")).collect();
    assert_eq!(got, want);
}

#[tokio::test]
async fn stop_closes_channel_while_source_is_open() {
    let (mut feed, source) = stream_feed(1024);
    let (tx, mut rx) = mpsc::channel(16);
    let reader = EventStreamReader::spawn(source, tx);

    feed.send_line(r#"{"type":"quote","symbol":"AAPL"}"#).await.unwrap();
    assert!(rx.recv().await.is_some());

    reader.stop();
    let closed = timeout(WAIT, rx.recv()).await.expect("channel closes after stop");
    assert!(closed.is_none());
    timeout(WAIT, reader.wait()).await.expect("reader exits");

    // the reader dropped its half of the pipe
    assert!(feed.send_line("{}").await.is_err());
}

#[tokio::test]
async fn stop_is_idempotent() {
    let (_feed, source) = stream_feed(64);
    let (tx, mut rx) = mpsc::channel(4);
    let reader = EventStreamReader::spawn(source, tx);

    reader.stop();
    reader.stop();
    assert!(reader.is_stopped());
    assert!(timeout(WAIT, rx.recv()).await.expect("closes").is_none());
    reader.stop();
    timeout(WAIT, reader.shutdown()).await.expect("reader exits");
}

#[tokio::test]
async fn dropped_receiver_ends_reader() {
    let (mut feed, source) = stream_feed(1024);
    let (tx, rx) = mpsc::channel(1);
    let reader = EventStreamReader::spawn(source, tx);
    drop(rx);

    feed.send_line(r#"{"type":"summary","symbol":"SPY"}"#).await.unwrap();
    timeout(WAIT, reader.wait()).await.expect("reader exits");
}

#[tokio::test]
async fn dropping_the_handle_stops_reader_and_releases_source() {
    let (mut feed, source) = stream_feed(1024);
    let (tx, mut rx) = mpsc::channel(16);
    let reader = EventStreamReader::spawn(source, tx);

    feed.send_line(r#"{"type":"quote","symbol":"AAPL"}"#).await.unwrap();
    assert!(rx.recv().await.is_some());

    // the receiver stays alive, so only the dropped handle can end the task
    drop(reader);
    let closed = timeout(WAIT, rx.recv()).await.expect("channel closes after drop");
    assert!(closed.is_none());
    assert!(feed.send_line("{}").await.is_err());
}

#[tokio::test]
async fn overlong_record_is_reported_and_stream_continues() {
    let (tx, mut rx) = mpsc::channel(4);
    let huge = format!(r#"{{"type":"trade","symbol":"{}"}}"#, "X".repeat(MAX_RECORD_BYTES));
    let _reader = EventStreamReader::spawn(
        line_source(&[&huge, r#"{"type":"quote","symbol":"AAPL"}"#]),
        tx,
    );

    let rejected = rx.recv().await.expect("error envelope");
    assert!(matches!(rejected.error, Some(TradierError::Stream(_))));
    assert!(rejected.payload.is_empty());
    let next = rx.recv().await.expect("following record");
    assert_eq!(next.event_kind(), EventKind::Quote);
    assert_eq!(next.symbol, "AAPL");
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn undecodable_line_is_forwarded_with_error() {
    let (tx, mut rx) = mpsc::channel(4);
    let _reader = EventStreamReader::spawn(line_source(&["{\"type\":\"trade\"", "\r"]), tx);

    let env = rx.recv().await.expect("error envelope");
    assert!(env.error.is_some());
    assert_eq!(env.payload, b"{\"type\":\"trade\"".to_vec());
    // a bare carriage return is a heartbeat
    assert!(rx.recv().await.is_none());
}

proptest::proptest! {
    #![proptest_config(proptest::prelude::ProptestConfig { cases: 24, .. proptest::prelude::ProptestConfig::default() })]
    #[test]
    fn every_record_is_delivered_once_in_order(count in 0usize..60, capacity in 1usize..8) {
        tokio_test::block_on(async move {
            let lines: Vec<String> = (0..count)
                .map(|i| format!(r#"{{"type":"quote","symbol":"Q{i}"}}"#))
                .collect();
            let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
            let (tx, mut rx) = mpsc::channel(capacity);
            let reader = EventStreamReader::spawn(line_source(&refs), tx);

            let mut got = Vec::new();
            while let Some(env) = rx.recv().await {
                got.push(env.symbol);
            }
            reader.wait().await;
            let want: Vec<String> = (0..count).map(|i| format!("Q{i}")).collect();
            assert_eq!(got, want);
        });
    }
}
