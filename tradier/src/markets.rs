use tradier_core::RequestDescriptor;
use tradier_types::{ClockEnvelope, MarketClock, Quote, QuotesEnvelope, TradierError};

use crate::Client;

impl Client {
    /// Latest quotes for `symbols`, optionally with option greeks.
    ///
    /// Sent as a form POST so long symbol lists do not overflow the URL.
    ///
    /// # Errors
    /// `TradierError::InvalidArg` for an empty symbol list, otherwise any
    /// executor error.
    pub async fn quotes(&self, symbols: &[&str], greeks: bool) -> Result<Vec<Quote>, TradierError> {
        if symbols.is_empty() {
            return Err(TradierError::invalid_arg("list of symbols is required"));
        }
        let url = self.api_url("/v1/markets/quotes")?;
        let request = self.request(
            RequestDescriptor::post(url.as_str())
                .form_param("symbols", symbols.join(","))
                .form_param("greeks", greeks.to_string()),
        );
        let envelope: QuotesEnvelope = self.executor.execute_json(&request).await?;
        Ok(envelope.into_quotes())
    }

    /// Current market session state.
    ///
    /// # Errors
    /// Any executor error.
    pub async fn market_clock(&self) -> Result<MarketClock, TradierError> {
        let url = self.api_url("/v1/markets/clock")?;
        let request = self.request(RequestDescriptor::get(url.as_str()));
        let envelope: ClockEnvelope = self.executor.execute_json(&request).await?;
        Ok(envelope.clock)
    }
}
