use serde::Deserialize;
use serde::de::DeserializeOwned;
use tradier_types::{QuoteEvent, SummaryEvent, TimeSaleEvent, TradeEvent, TradierError};

/// Event type carried by a stream record's `type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `"quote"`
    Quote,
    /// `"trade"`
    Trade,
    /// `"timesale"`
    TimeSale,
    /// `"summary"`
    Summary,
    /// Any other tag; ignored by the demultiplexer.
    Unknown(String),
}

impl EventKind {
    /// Classify a raw type tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "quote" => Self::Quote,
            "trade" => Self::Trade,
            "timesale" => Self::TimeSale,
            "summary" => Self::Summary,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// One partially decoded stream record.
///
/// Only the `type` and `symbol` fields are decoded eagerly; `payload` keeps
/// the full raw line so the typed decode can happen once the tag is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEnvelope {
    /// Raw `type` tag; empty when the line could not be decoded.
    pub kind: String,
    /// Symbol the record refers to.
    pub symbol: String,
    /// Raw record bytes without the trailing newline.
    pub payload: Vec<u8>,
    /// Decode failure of the envelope itself, if any.
    pub error: Option<TradierError>,
}

#[derive(Deserialize)]
struct Head {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    symbol: String,
}

impl StreamEnvelope {
    /// Decode the envelope fields of one record.
    ///
    /// Never fails: a malformed line produces an envelope whose `error` is set
    /// and whose `payload` still holds the raw bytes.
    #[must_use]
    pub fn decode(line: &[u8]) -> Self {
        match serde_json::from_slice::<Head>(line) {
            Ok(head) => Self {
                kind: head.kind,
                symbol: head.symbol,
                payload: line.to_vec(),
                error: None,
            },
            Err(e) => Self {
                kind: String::new(),
                symbol: String::new(),
                payload: line.to_vec(),
                error: Some(TradierError::EventDecode {
                    kind: String::new(),
                    payload: String::from_utf8_lossy(line).into_owned(),
                    message: e.to_string(),
                }),
            },
        }
    }

    /// Envelope for a record that was dropped before decoding.
    #[must_use]
    pub const fn rejected(error: TradierError) -> Self {
        Self {
            kind: String::new(),
            symbol: String::new(),
            payload: Vec::new(),
            error: Some(error),
        }
    }

    /// Classified type tag.
    #[must_use]
    pub fn event_kind(&self) -> EventKind {
        EventKind::from_tag(&self.kind)
    }

    /// Raw payload as text, lossily decoded.
    #[must_use]
    pub fn payload_str(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    fn decode_as<T: DeserializeOwned>(&self) -> Result<T, TradierError> {
        serde_json::from_slice(&self.payload).map_err(|e| TradierError::EventDecode {
            kind: self.kind.clone(),
            payload: self.payload_str(),
            message: e.to_string(),
        })
    }

    /// Decode the payload as a quote event, defaulting the symbol from the envelope.
    ///
    /// # Errors
    /// `TradierError::EventDecode` carrying the raw payload.
    pub fn decode_quote(&self) -> Result<QuoteEvent, TradierError> {
        let mut q: QuoteEvent = self.decode_as()?;
        if q.symbol.is_empty() {
            q.symbol.clone_from(&self.symbol);
        }
        Ok(q)
    }

    /// Decode the payload as a trade event.
    ///
    /// # Errors
    /// `TradierError::EventDecode` carrying the raw payload.
    pub fn decode_trade(&self) -> Result<TradeEvent, TradierError> {
        let mut t: TradeEvent = self.decode_as()?;
        if t.symbol.is_empty() {
            t.symbol.clone_from(&self.symbol);
        }
        Ok(t)
    }

    /// Decode the payload as a time-and-sales event.
    ///
    /// # Errors
    /// `TradierError::EventDecode` carrying the raw payload.
    pub fn decode_time_sale(&self) -> Result<TimeSaleEvent, TradierError> {
        let mut ts: TimeSaleEvent = self.decode_as()?;
        if ts.symbol.is_empty() {
            ts.symbol.clone_from(&self.symbol);
        }
        Ok(ts)
    }

    /// Decode the payload as a summary event.
    ///
    /// # Errors
    /// `TradierError::EventDecode` carrying the raw payload.
    pub fn decode_summary(&self) -> Result<SummaryEvent, TradierError> {
        let mut s: SummaryEvent = self.decode_as()?;
        if s.symbol.is_empty() {
            s.symbol.clone_from(&self.symbol);
        }
        Ok(s)
    }
}
