use reqwest::Method;
use serde_json::json;
use tradier::TradierError;
use tradier_mock::{ManualClock, MockReply, ScriptedTransport};

use crate::helpers::{ENDPOINT, client, t0};

#[tokio::test]
async fn quotes_post_symbols_as_form() {
    let transport = ScriptedTransport::new().reply(MockReply::ok_json(&json!({
        "quotes": { "quote": [
            { "symbol": "AAPL", "type": "stock", "last": 190.5, "bid": 190.4, "ask": 190.6 },
            { "symbol": "SPY", "type": "etf", "last": null }
        ]}
    })));
    let clock = ManualClock::new(t0());
    let c = client(&transport, &clock);

    let quotes = c.quotes(&["AAPL", "SPY"], true).await.expect("quotes");
    assert_eq!(quotes.len(), 2);
    assert_eq!(quotes[0].symbol, "AAPL");
    assert_eq!(quotes[0].last, Some(190.5));
    assert_eq!(quotes[1].kind, "etf");
    assert_eq!(quotes[1].last, None);

    let requests = transport.requests();
    let req = &requests[0];
    assert_eq!(req.method, Method::POST);
    assert_eq!(req.url, format!("{ENDPOINT}/v1/markets/quotes"));
    assert_eq!(req.form_value("symbols"), Some("AAPL,SPY"));
    assert_eq!(req.form_value("greeks"), Some("true"));
    assert_eq!(req.max_retries, 3);
}

#[tokio::test]
async fn quotes_require_symbols() {
    let transport = ScriptedTransport::new();
    let clock = ManualClock::new(t0());
    let c = client(&transport, &clock);

    let err = c.quotes(&[], false).await.expect_err("invalid");
    assert!(matches!(err, TradierError::InvalidArg(_)));
    assert_eq!(transport.attempts(), 0);
}

#[tokio::test]
async fn market_clock_is_retried_through_outage() {
    let transport = ScriptedTransport::new()
        .reply(MockReply::status(503, "Service Unavailable"))
        .reply(MockReply::ok_json(&json!({
            "clock": { "date": "2024-01-02", "description": "Market is open from 09:30 to 16:00",
                       "state": "open", "next_change": "16:00", "next_state": "postmarket" }
        })));
    let clock = ManualClock::new(t0());
    let c = client(&transport, &clock);

    let mc = c.market_clock().await.expect("clock");
    assert_eq!(mc.state, "open");
    assert_eq!(mc.next_state.as_deref(), Some("postmarket"));
    assert_eq!(transport.attempts(), 2);
    assert_eq!(clock.sleeps().len(), 1);
}
