use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tradier::tradier_core::{RangeFetcher, fetch_range};
use tradier::tradier_types::{ApiError, ERR_BODY_TOO_LARGE};
use tradier::{TimeRange, TradierError};

use crate::helpers::t0;

fn too_large() -> TradierError {
    TradierError::Api(ApiError {
        status: 400,
        fault_string: "Body buffer overflow".into(),
        error_code: Some(ERR_BODY_TOO_LARGE.into()),
        message: None,
        structured: true,
    })
}

/// One record per minute; refuses any range holding more than `limit` records.
struct MinuteBars {
    records: Vec<DateTime<Utc>>,
    limit: usize,
    calls: Mutex<Vec<TimeRange>>,
}

impl MinuteBars {
    fn new(start: DateTime<Utc>, minutes: i64, limit: usize) -> Self {
        Self {
            records: (0..minutes).map(|m| start + Duration::minutes(m)).collect(),
            limit,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn in_range(&self, range: &TimeRange) -> Vec<DateTime<Utc>> {
        self.records.iter().copied().filter(|t| range.contains(*t)).collect()
    }
}

#[async_trait]
impl RangeFetcher for MinuteBars {
    type Record = DateTime<Utc>;

    async fn fetch(&self, range: &TimeRange) -> Result<Vec<DateTime<Utc>>, TradierError> {
        self.calls.lock().unwrap().push(*range);
        let rows = self.in_range(range);
        if rows.len() > self.limit {
            return Err(too_large());
        }
        Ok(rows)
    }
}

/// Refuses every range longer than `max_span`.
struct SpanLimited {
    max_span: Duration,
    calls: Mutex<Vec<TimeRange>>,
}

#[async_trait]
impl RangeFetcher for SpanLimited {
    type Record = DateTime<Utc>;

    async fn fetch(&self, range: &TimeRange) -> Result<Vec<DateTime<Utc>>, TradierError> {
        self.calls.lock().unwrap().push(*range);
        let end = range.end().expect("closed range");
        if end - range.start() >= self.max_span {
            return Err(too_large());
        }
        Ok(vec![range.start()])
    }
}

#[tokio::test]
async fn bisected_result_matches_unsplit_fetch() {
    let start = t0();
    let fetcher = MinuteBars::new(start, 390, 50);
    let range = TimeRange::new(start, Some(start + Duration::minutes(390))).unwrap();

    let got = fetch_range(&fetcher, range, start).await.expect("bisects");
    assert_eq!(got, fetcher.in_range(&range));
    assert!(got.windows(2).all(|w| w[0] < w[1]));
    assert!(fetcher.calls.lock().unwrap().len() > 1);
}

#[tokio::test]
async fn open_ended_range_resolves_against_now() {
    let start = t0();
    let now = start + Duration::minutes(120);
    let fetcher = MinuteBars::new(start, 130, 40);

    let got = fetch_range(&fetcher, TimeRange::since(start), now)
        .await
        .expect("bisects");
    // the last half keeps its open end, so records after `now` are kept too
    assert_eq!(got.len(), 130);
    let calls = fetcher.calls.lock().unwrap();
    assert!(calls.iter().any(|r| r.end().is_none()));
}

#[tokio::test]
async fn split_depth_is_bounded_by_minimum_span() {
    let start = t0();
    let fetcher = SpanLimited {
        max_span: Duration::hours(1),
        calls: Mutex::new(Vec::new()),
    };
    let range = TimeRange::new(start, Some(start + Duration::days(10))).unwrap();

    let got = fetch_range(&fetcher, range, start).await.expect("bisects");
    // 10 days halves 8 times before dropping below an hour: 256 leaves, 511 calls
    assert_eq!(got.len(), 256);
    let calls = fetcher.calls.lock().unwrap();
    assert_eq!(calls.len(), 511);
    assert!(calls.iter().all(|r| r.span(start) >= Duration::minutes(1)));
}

#[tokio::test]
async fn gives_up_once_halves_drop_below_a_minute() {
    let start = t0();
    let fetcher = SpanLimited {
        max_span: Duration::seconds(10),
        calls: Mutex::new(Vec::new()),
    };
    let range = TimeRange::new(start, Some(start + Duration::minutes(3))).unwrap();

    let err = fetch_range(&fetcher, range, start).await.expect_err("cannot split");
    assert!(err.is_body_too_large());
    // whole range, then the first 90s half which cannot be split again
    assert_eq!(fetcher.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn other_errors_propagate_unchanged() {
    struct Broken;

    #[async_trait]
    impl RangeFetcher for Broken {
        type Record = ();

        async fn fetch(&self, _range: &TimeRange) -> Result<Vec<()>, TradierError> {
            Err(TradierError::Transport("refused".into()))
        }
    }

    let range = TimeRange::new(t0(), Some(t0() + Duration::days(1))).unwrap();
    let err = fetch_range(&Broken, range, t0()).await.expect_err("fails");
    assert_eq!(err, TradierError::Transport("refused".into()));
}

proptest::proptest! {
    #![proptest_config(proptest::prelude::ProptestConfig { cases: 32, .. proptest::prelude::ProptestConfig::default() })]
    #[test]
    fn bisection_never_drops_or_duplicates(minutes in 1i64..600, limit in 2usize..100, extra in 0i64..120) {
        tokio_test::block_on(async move {
            let start = t0();
            let fetcher = MinuteBars::new(start, minutes, limit);
            let range = TimeRange::new(start, Some(start + Duration::minutes(minutes + extra))).unwrap();

            let got = fetch_range(&fetcher, range, start).await.expect("splittable");
            assert_eq!(got, fetcher.in_range(&range));
        });
    }
}
