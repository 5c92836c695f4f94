//! Recursive time-range bisection for oversized history responses.
//!
//! When the server refuses a history request because the response would be
//! too large, the range is split at its midpoint and both halves are fetched
//! independently (first half first) and concatenated. Splitting stops once the
//! half after the midpoint is shorter than [`MIN_BISECT_SPAN`]; the oversized-body
//! error is returned unchanged in that case.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::future::BoxFuture;
use tradier_types::{TimeRange, TradierError};

/// Smallest span worth splitting again.
pub const MIN_BISECT_SPAN: Duration = Duration::minutes(1);

/// Fetches the records of one half-open time range.
///
/// Implementations must return records in chronological order and only those
/// that fall inside the requested range, so adjacent halves never overlap.
#[async_trait]
pub trait RangeFetcher: Send + Sync {
    /// Record type produced by the endpoint.
    type Record: Send;

    /// Fetch every record in `range`.
    async fn fetch(&self, range: &TimeRange) -> Result<Vec<Self::Record>, TradierError>;
}

/// Fetch `range`, bisecting recursively whenever the server reports an oversized body.
///
/// `now` resolves an open-ended range when computing the midpoint.
///
/// # Errors
/// Propagates every error except an oversized-body error on a range that can
/// still be split; an oversized-body error on a range below the minimum span
/// is returned unchanged.
pub async fn fetch_range<F>(
    fetcher: &F,
    range: TimeRange,
    now: DateTime<Utc>,
) -> Result<Vec<F::Record>, TradierError>
where
    F: RangeFetcher + ?Sized,
{
    fetch_range_at_depth(fetcher, range, now, 0).await
}

fn fetch_range_at_depth<'a, F>(
    fetcher: &'a F,
    range: TimeRange,
    now: DateTime<Utc>,
    depth: u32,
) -> BoxFuture<'a, Result<Vec<F::Record>, TradierError>>
where
    F: RangeFetcher + ?Sized,
{
    Box::pin(async move {
        let err = match fetcher.fetch(&range).await {
            Ok(records) => return Ok(records),
            Err(err) if err.is_body_too_large() => err,
            Err(err) => return Err(err),
        };

        let middle = range.midpoint(now);
        if range.resolved_end(now) - middle < MIN_BISECT_SPAN {
            #[cfg(feature = "tracing")]
            tracing::warn!(start = %range.start(), ?depth, "range too small to split further");
            return Err(err);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(start = %range.start(), %middle, depth, "response too large, bisecting range");

        let first = TimeRange::new(range.start(), Some(middle))?;
        let second = TimeRange::new(middle, range.end())?;

        let mut records = fetch_range_at_depth(fetcher, first, now, depth + 1).await?;
        let tail = fetch_range_at_depth(fetcher, second, now, depth + 1).await?;
        records.extend(tail);
        Ok(records)
    })
}
