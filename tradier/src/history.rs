use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::America::New_York;
use tradier_core::{RangeFetcher, RequestDescriptor, fetch_range};
use tradier_types::{
    HistoryEnvelope, Interval, SeriesEnvelope, TimeRange, TimeSale, TradierError,
};
use url::Url;

use crate::Client;

const HISTORY_PATH: &str = "/v1/markets/history";
const TIME_SALES_PATH: &str = "/v1/markets/timesales";
const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

impl Client {
    /// Price bars or prints for `symbol` over `range`.
    ///
    /// Daily, weekly, and monthly intervals come from the history endpoint;
    /// finer intervals from time-and-sales. When the server refuses a range as
    /// too large, the range is bisected and the halves are fetched in order.
    /// Intraday rows are limited to the half-open `range`; coarse bars are
    /// returned as the server sends them for the requested dates, with no
    /// session repeated across split points.
    ///
    /// # Errors
    /// - `TradierError::InvalidArg` for an empty symbol.
    /// - Any executor error, or the oversized-body error once the range can no
    ///   longer be split.
    pub async fn time_sales(
        &self,
        symbol: &str,
        interval: Interval,
        range: TimeRange,
    ) -> Result<Vec<TimeSale>, TradierError> {
        if symbol.trim().is_empty() {
            return Err(TradierError::invalid_arg("symbol is required"));
        }
        let fetcher = TimeSalesFetcher {
            client: self,
            symbol,
            interval,
            requested: range,
        };
        fetch_range(&fetcher, range, self.clock().now()).await
    }

    /// URL of a time-sales or history request for one range.
    pub(crate) fn time_sales_url(
        &self,
        symbol: &str,
        interval: Interval,
        range: &TimeRange,
    ) -> Result<Url, TradierError> {
        let path = if interval.is_daily_or_coarser() {
            HISTORY_PATH
        } else {
            TIME_SALES_PATH
        };
        let mut url = self.api_url(path)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("symbol", symbol)
                .append_pair("interval", interval.as_str())
                .append_pair("start", &render_time(interval, range.start()));
            if let Some(end) = range.end() {
                query.append_pair("end", &render_time(interval, end));
            }
        }
        Ok(url)
    }
}

/// Dates in UTC for the history endpoint, New York wall time for time-and-sales.
fn render_time(interval: Interval, t: DateTime<Utc>) -> String {
    if interval.is_daily_or_coarser() {
        t.format(DATE_FORMAT).to_string()
    } else {
        t.with_timezone(&New_York).format(DATETIME_FORMAT).to_string()
    }
}

struct TimeSalesFetcher<'a> {
    client: &'a Client,
    symbol: &'a str,
    interval: Interval,
    /// Range the caller asked for, before any bisection.
    requested: TimeRange,
}

#[async_trait]
impl<'a> RangeFetcher for TimeSalesFetcher<'a> {
    type Record = TimeSale;

    async fn fetch(&self, range: &TimeRange) -> Result<Vec<TimeSale>, TradierError> {
        let url = self.client.time_sales_url(self.symbol, self.interval, range)?;
        let request = self.client.request(RequestDescriptor::get(url.as_str()));

        let rows = if self.interval.is_daily_or_coarser() {
            self.client
                .executor
                .execute_json::<HistoryEnvelope>(&request)
                .await?
                .into_rows()
        } else {
            self.client
                .executor
                .execute_json::<SeriesEnvelope>(&request)
                .await?
                .into_rows()
        };
        Ok(self.within(rows, range))
    }
}

impl TimeSalesFetcher<'_> {
    /// Drop rows that belong to the neighbouring half of a split range.
    ///
    /// Intraday rows are filtered to the half-open `range`. Coarse bars are
    /// matched by session date, and only at bounds introduced by bisection:
    /// whatever the server returns for the requested range itself is kept,
    /// including bars dated before a mid-session start. Rows without any time
    /// are kept in server order.
    fn within(&self, rows: Vec<TimeSale>, range: &TimeRange) -> Vec<TimeSale> {
        let coarse = self.interval.is_daily_or_coarser();
        let lower = (range.start() != self.requested.start()).then_some(range.start());
        let upper = range.end().filter(|_| range.end() != self.requested.end());
        rows.into_iter()
            .filter(|row| match row.instant() {
                None => true,
                Some(t) if coarse => on_session_day(t, lower, upper),
                Some(t) => range.contains(t),
            })
            .collect()
    }
}

/// Session-date test against split points; the split date belongs to the later half.
fn on_session_day(
    t: DateTime<Utc>,
    lower: Option<DateTime<Utc>>,
    upper: Option<DateTime<Utc>>,
) -> bool {
    let day = t.date_naive();
    lower.is_none_or(|l| day >= l.date_naive()) && upper.is_none_or(|u| day < u.date_naive())
}
