use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::de::{flexible_time, lenient_f64, lenient_i64, one_or_many};

/// One bar or print from the history or time-and-sales endpoints.
///
/// Daily history rows populate `date`; intraday rows populate `time` and
/// `timestamp`. Missing prices decode as `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSale {
    /// Session date for daily/weekly/monthly bars.
    #[serde(default, deserialize_with = "flexible_time")]
    pub date: Option<DateTime<Utc>>,
    /// Bar or print time for intraday rows.
    #[serde(default, deserialize_with = "flexible_time")]
    pub time: Option<DateTime<Utc>>,
    /// Unix seconds for intraday rows.
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Opening price.
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub open: f64,
    /// High price.
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub high: f64,
    /// Low price.
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub low: f64,
    /// Closing price.
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub close: f64,
    /// Trade price.
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub price: f64,
    /// Volume-weighted average price.
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub vwap: f64,
    /// Traded volume.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub volume: i64,
}

const fn nan() -> f64 {
    f64::NAN
}

impl TimeSale {
    /// Best available instant for ordering and range filtering.
    ///
    /// Prefers the explicit Unix timestamp, then the intraday time, then the session date.
    #[must_use]
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .and_then(|s| DateTime::from_timestamp(s, 0))
            .or(self.time)
            .or(self.date)
    }
}

/// `{"history":{"day":[...]}}` body of the history endpoint.
#[derive(Debug, Deserialize)]
pub struct HistoryEnvelope {
    /// Bars; `None` when the range is empty.
    #[serde(default)]
    pub history: Option<HistoryDays>,
}

/// Inner list of daily bars; `null` when the range is empty.
#[derive(Debug, Deserialize, Default)]
pub struct HistoryDays {
    /// Daily, weekly, or monthly bars.
    #[serde(default, deserialize_with = "one_or_many")]
    pub day: Vec<TimeSale>,
}

/// `{"series":{"data":[...]}}` body of the time-and-sales endpoint.
#[derive(Debug, Deserialize)]
pub struct SeriesEnvelope {
    /// Rows; `None` when the range is empty.
    #[serde(default)]
    pub series: Option<SeriesData>,
}

/// Inner list of intraday rows; `null` when the range is empty.
#[derive(Debug, Deserialize, Default)]
pub struct SeriesData {
    /// Intraday rows.
    #[serde(default, deserialize_with = "one_or_many")]
    pub data: Vec<TimeSale>,
}

impl HistoryEnvelope {
    /// Flatten into the bar list.
    #[must_use]
    pub fn into_rows(self) -> Vec<TimeSale> {
        self.history.map(|h| h.day).unwrap_or_default()
    }
}

impl SeriesEnvelope {
    /// Flatten into the row list.
    #[must_use]
    pub fn into_rows(self) -> Vec<TimeSale> {
        self.series.map(|s| s.data).unwrap_or_default()
    }
}
