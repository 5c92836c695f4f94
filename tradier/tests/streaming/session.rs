use std::time::Duration;

use serde_json::json;
use tokio::time::timeout;
use tradier::TradierError;
use tradier_mock::{ManualClock, MockReply, ScriptedTransport, stream_feed};

use crate::helpers::{ENDPOINT, client, t0};

fn session(url: &str) -> MockReply {
    MockReply::ok_json(&json!({ "stream": { "url": url, "sessionid": "abc" } }))
}

#[tokio::test]
async fn symbols_are_required() {
    let transport = ScriptedTransport::new();
    let c = client(&transport, &ManualClock::new(t0()));

    let err = c.stream_market_events(&[], &[]).await.expect_err("invalid");
    assert!(matches!(err, TradierError::InvalidArg(_)));
    assert_eq!(transport.attempts(), 0);
}

#[tokio::test]
async fn missing_session_id_is_a_stream_error() {
    let transport =
        ScriptedTransport::new().reply(MockReply::ok_json(&json!({ "stream": { "url": "x" } })));
    let c = client(&transport, &ManualClock::new(t0()));

    let err = c.stream_market_events(&["SPY"], &[]).await.expect_err("no session");
    assert!(matches!(err, TradierError::Stream(_)));
    assert_eq!(transport.attempts(), 1);
}

#[tokio::test]
async fn session_request_is_retried() {
    let (_feed, source) = stream_feed(64);
    let transport = ScriptedTransport::new()
        .reply(MockReply::transport_error("reset"))
        .reply(session("https://stream.tradier.test/v1/markets/events"))
        .reply(MockReply::streaming(source));
    let clock = ManualClock::new(t0());
    let c = client(&transport, &clock);

    let stream = c.stream_market_events(&["SPY"], &[]).await.expect("opens");
    assert_eq!(transport.attempts(), 3);
    assert_eq!(clock.sleeps().len(), 1);
    assert_eq!(transport.requests()[2].form_value("filter"), None);
    stream.stop();
}

#[tokio::test]
async fn failed_open_is_not_retried() {
    let transport = ScriptedTransport::new()
        .reply(session("https://stream.tradier.test/v1/markets/events"))
        .reply(MockReply::status(500, "session expired"))
        .reply(MockReply::status(200, ""));
    let clock = ManualClock::new(t0());
    let c = client(&transport, &clock);

    let err = c.stream_market_events(&["SPY"], &[]).await.expect_err("open fails");
    assert_eq!(err.api().map(|a| a.status), Some(500));
    assert_eq!(transport.attempts(), 2);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn empty_url_falls_back_to_stream_endpoint() {
    let transport = ScriptedTransport::new()
        .reply(session(""))
        .reply(MockReply::streaming(tradier_mock::line_source(&[])));
    let c = client(&transport, &ManualClock::new(t0()));

    let mut stream = c.stream_market_events(&["SPY"], &[]).await.expect("opens");
    assert!(timeout(Duration::from_secs(5), stream.recv()).await.unwrap().is_none());
    let requests = transport.requests();
    assert_eq!(requests[0].url, format!("{ENDPOINT}/v1/markets/events/session"));
    assert_eq!(requests[1].url, format!("{}/v1/markets/events", c.config().stream_endpoint));
}

#[tokio::test]
async fn stop_token_ends_stream_from_another_task() {
    let (mut feed, source) = stream_feed(1024);
    let transport = ScriptedTransport::new()
        .reply(session("https://stream.tradier.test/v1/markets/events"))
        .reply(MockReply::streaming(source));
    let c = client(&transport, &ManualClock::new(t0()));

    let mut stream = c.stream_market_events(&["SPY"], &[]).await.expect("opens");
    feed.send_line(r#"{"type":"quote","symbol":"SPY"}"#).await.unwrap();
    assert!(stream.recv().await.is_some());

    let token = stream.stop_token();
    tokio::spawn(async move { token.cancel() }).await.unwrap();
    let end = timeout(Duration::from_secs(5), stream.recv()).await.expect("closes");
    assert!(end.is_none());
}
