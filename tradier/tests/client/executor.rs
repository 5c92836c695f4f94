use std::time::Duration;

use tradier::{ConstantBackoff, StopBackoff, TradierError};
use tradier_mock::{ManualClock, MockReply, ScriptedTransport};

use crate::helpers::{RETRY_DELAY, executor, init_tracing, request, t0};

#[tokio::test]
async fn transport_errors_exhaust_retry_budget() {
    init_tracing();
    let transport = ScriptedTransport::new();
    let clock = ManualClock::new(t0());
    let exec = executor(&transport, &clock, ConstantBackoff(RETRY_DELAY));

    let err = exec.execute(&request(3)).await.expect_err("always failing");
    assert!(matches!(err, TradierError::Transport(_)));
    assert_eq!(transport.attempts(), 4);
    // no sleep after the final attempt
    assert_eq!(clock.sleeps(), vec![RETRY_DELAY; 3]);
}

#[tokio::test]
async fn zero_retries_means_one_attempt() {
    let transport = ScriptedTransport::new();
    let clock = ManualClock::new(t0());
    let exec = executor(&transport, &clock, ConstantBackoff(RETRY_DELAY));

    exec.execute(&request(0)).await.expect_err("failing");
    assert_eq!(transport.attempts(), 1);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn first_ok_short_circuits() {
    let transport = ScriptedTransport::new()
        .reply(MockReply::transport_error("connection reset"))
        .reply(MockReply::status(200, r#"{"clock":{"state":"open"}}"#))
        .reply(MockReply::status(200, "unused"));
    let clock = ManualClock::new(t0());
    let exec = executor(&transport, &clock, ConstantBackoff(RETRY_DELAY));

    let resp = exec.execute(&request(3)).await.expect("second attempt succeeds");
    assert_eq!(resp.status.as_u16(), 200);
    assert_eq!(transport.attempts(), 2);
    assert_eq!(transport.remaining(), 1);
    assert_eq!(clock.sleeps().len(), 1);
}

#[tokio::test]
async fn structured_error_is_returned_without_retry() {
    let transport = ScriptedTransport::new()
        .reply(MockReply::api_error(400, "Invalid symbol", "invalid.symbol"));
    let clock = ManualClock::new(t0());
    let exec = executor(&transport, &clock, ConstantBackoff(RETRY_DELAY));

    let err = exec.execute(&request(3)).await.expect_err("rejected");
    let api = err.api().expect("api error");
    assert!(api.structured);
    assert_eq!(api.status, 400);
    assert_eq!(api.fault_string, "Invalid symbol");
    assert_eq!(api.error_code.as_deref(), Some("invalid.symbol"));
    assert!(!err.is_retryable());
    assert_eq!(transport.attempts(), 1);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn opaque_error_is_retried_and_last_one_returned() {
    let transport = ScriptedTransport::with_responder(|_| MockReply::status(502, "Bad Gateway"));
    let clock = ManualClock::new(t0());
    let exec = executor(&transport, &clock, ConstantBackoff(RETRY_DELAY));

    let err = exec.execute(&request(2)).await.expect_err("never recovers");
    let api = err.api().expect("api error");
    assert!(!api.structured);
    assert_eq!(api.status, 502);
    assert_eq!(api.fault_string, "Bad Gateway");
    assert_eq!(transport.attempts(), 3);
    assert_eq!(clock.sleeps().len(), 2);
}

#[tokio::test]
async fn quota_violation_waits_until_renewal_plus_margin() {
    let renew_ms = (t0() + chrono::Duration::seconds(10)).timestamp_millis();
    let transport = ScriptedTransport::new()
        .reply(MockReply::status(
            429,
            format!("Quota Violation: request limit reached, renews at {renew_ms}"),
        ))
        .reply(MockReply::status(200, "{}"));
    let clock = ManualClock::new(t0());
    let exec = executor(&transport, &clock, ConstantBackoff(RETRY_DELAY));

    exec.execute(&request(3)).await.expect("succeeds after renewal");
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(11)]);
}

#[tokio::test]
async fn exhausted_headers_extend_wait() {
    let renew_ms = (t0() + chrono::Duration::seconds(5)).timestamp_millis();
    let transport = ScriptedTransport::new()
        .reply(
            MockReply::status(503, "slow down")
                .with_header("X-Ratelimit-Available", "0")
                .with_header("X-Ratelimit-Expiry", &renew_ms.to_string()),
        )
        .reply(MockReply::status(200, "{}"));
    let clock = ManualClock::new(t0());
    let exec = executor(&transport, &clock, ConstantBackoff(RETRY_DELAY));

    exec.execute(&request(3)).await.expect("succeeds");
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(6)]);
}

#[tokio::test]
async fn past_renewal_falls_back_to_backoff() {
    let renew_ms = (t0() - chrono::Duration::seconds(30)).timestamp_millis();
    let transport = ScriptedTransport::new()
        .reply(MockReply::status(429, format!("Quota Violation {renew_ms}")))
        .reply(MockReply::status(200, "{}"));
    let clock = ManualClock::new(t0());
    let exec = executor(&transport, &clock, ConstantBackoff(RETRY_DELAY));

    exec.execute(&request(3)).await.expect("succeeds");
    assert_eq!(clock.sleeps(), vec![RETRY_DELAY]);
}

#[tokio::test]
async fn remaining_headers_do_not_extend_wait() {
    let renew_ms = (t0() + chrono::Duration::minutes(5)).timestamp_millis();
    let transport = ScriptedTransport::new()
        .reply(
            MockReply::status(500, "oops")
                .with_header("X-Ratelimit-Available", "12")
                .with_header("X-Ratelimit-Expiry", &renew_ms.to_string()),
        )
        .reply(MockReply::status(200, "{}"));
    let clock = ManualClock::new(t0());
    let exec = executor(&transport, &clock, ConstantBackoff(RETRY_DELAY));

    exec.execute(&request(3)).await.expect("succeeds");
    assert_eq!(clock.sleeps(), vec![RETRY_DELAY]);
}

#[tokio::test]
async fn stop_sentinel_ends_retries() {
    let transport = ScriptedTransport::new();
    let clock = ManualClock::new(t0());
    let exec = executor(&transport, &clock, StopBackoff);

    let err = exec.execute(&request(5)).await.expect_err("stops");
    assert!(matches!(err, TradierError::Transport(_)));
    assert_eq!(transport.attempts(), 1);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn malformed_ok_body_is_a_decode_error() {
    let transport = ScriptedTransport::new()
        .reply(MockReply::status(200, "<html>maintenance</html>"))
        .reply(MockReply::status(200, "{}"));
    let clock = ManualClock::new(t0());
    let exec = executor(&transport, &clock, ConstantBackoff(RETRY_DELAY));

    let err = exec
        .execute_json::<serde_json::Value>(&request(3))
        .await
        .expect_err("not json");
    assert!(matches!(err, TradierError::Decode(_)));
    assert_eq!(transport.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn exponential_backoff_with_system_clock() {
    use std::sync::Arc;
    use tradier::{BackoffConfig, ExponentialBackoff, RetryingExecutor, SystemClock};

    let transport = ScriptedTransport::new()
        .reply(MockReply::transport_error("refused"))
        .reply(MockReply::transport_error("refused"))
        .reply(MockReply::status(200, "{}"));
    let backoff = ExponentialBackoff::new(BackoffConfig {
        initial_interval_ms: 100,
        max_interval_ms: 1_000,
        multiplier: 2.0,
        jitter_percent: 0,
        max_elapsed_ms: None,
    });
    let exec = RetryingExecutor::new(
        Arc::new(transport.clone()),
        Box::new(backoff),
        Arc::new(SystemClock),
    );

    let started = tokio::time::Instant::now();
    exec.execute(&request(3)).await.expect("third attempt succeeds");
    assert_eq!(started.elapsed(), Duration::from_millis(300));
    assert_eq!(transport.attempts(), 3);
}
