use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::TradierError;

/// Bar interval for history and time-and-sales requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Interval {
    /// Individual prints.
    #[serde(rename = "tick")]
    Tick,
    /// One-minute bars.
    #[serde(rename = "1min")]
    Minute,
    /// Five-minute bars.
    #[serde(rename = "5min")]
    FiveMinutes,
    /// Fifteen-minute bars.
    #[serde(rename = "15min")]
    FifteenMinutes,
    /// Daily bars.
    #[serde(rename = "daily")]
    Daily,
    /// Weekly bars.
    #[serde(rename = "weekly")]
    Weekly,
    /// Monthly bars.
    #[serde(rename = "monthly")]
    Monthly,
}

impl Interval {
    /// Wire representation used in query strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tick => "tick",
            Self::Minute => "1min",
            Self::FiveMinutes => "5min",
            Self::FifteenMinutes => "15min",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Daily, weekly, and monthly bars are served by the history endpoint;
    /// everything finer goes through time-and-sales.
    #[must_use]
    pub const fn is_daily_or_coarser(self) -> bool {
        matches!(self, Self::Daily | Self::Weekly | Self::Monthly)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = TradierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "tick" => Self::Tick,
            "1min" => Self::Minute,
            "5min" => Self::FiveMinutes,
            "15min" => Self::FifteenMinutes,
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "monthly" => Self::Monthly,
            other => return Err(TradierError::invalid_arg(format!("unknown interval: {other}"))),
        })
    }
}

/// Event types that can be requested on the market event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    /// Trade prints.
    Trade,
    /// Top-of-book quotes.
    Quote,
    /// Time-and-sales prints.
    Timesale,
    /// Session summary (open/high/low/previous close).
    Summary,
}

impl Filter {
    /// Wire representation used in the stream request form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trade => "trade",
            Self::Quote => "quote",
            Self::Timesale => "timesale",
            Self::Summary => "summary",
        }
    }
}

impl FromStr for Filter {
    type Err = TradierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trade" => Ok(Self::Trade),
            "quote" => Ok(Self::Quote),
            "timesale" => Ok(Self::Timesale),
            "summary" => Ok(Self::Summary),
            other => Err(TradierError::invalid_arg(format!("unknown filter: {other}"))),
        }
    }
}

/// Half-open time range `[start, end)` for historical queries.
///
/// An unset `end` means "now" and is resolved lazily by whoever needs a
/// concrete bound (e.g. the bisector).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Build a range, rejecting an `end` that is not strictly after `start`.
    ///
    /// # Errors
    /// Returns `TradierError::InvalidArg` when `end <= start`.
    pub fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<Self, TradierError> {
        if let Some(end) = end
            && end <= start
        {
            return Err(TradierError::invalid_arg(format!(
                "time range end {end} is not after start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Range from `start` up to the present.
    #[must_use]
    pub const fn since(start: DateTime<Utc>) -> Self {
        Self { start, end: None }
    }

    /// Inclusive lower bound.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive upper bound; `None` means "now".
    #[must_use]
    pub const fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    /// Concrete upper bound, substituting `now` for an open end.
    #[must_use]
    pub fn resolved_end(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.end.unwrap_or(now)
    }

    /// Length of the range, using `now` for an open end.
    #[must_use]
    pub fn span(&self, now: DateTime<Utc>) -> Duration {
        self.resolved_end(now) - self.start
    }

    /// Midpoint between `start` and the resolved end.
    #[must_use]
    pub fn midpoint(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.start + self.span(now) / 2
    }

    /// Returns true if `t` falls inside `[start, end)`.
    ///
    /// An open end admits everything from `start` on.
    #[must_use]
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && self.end.is_none_or(|end| t < end)
    }
}
