//! Price source trait definition.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::PriceQuote;

/// Capability to look up current prices.
///
/// Implement this trait to add a new price source.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use stratfolio_market_data::{PriceSource, PriceQuote, MarketDataError};
///
/// struct FixedSource;
///
/// #[async_trait]
/// impl PriceSource for FixedSource {
///     fn id(&self) -> &'static str {
///         "FIXED"
///     }
///
///     async fn get_quote(&self, ticker: &str) -> Result<PriceQuote, MarketDataError> {
///         Ok(PriceQuote::new(ticker, dec!(100), "USD", "FIXED"))
///     }
///
///     // ... implement get_batch_quotes
/// }
/// ```
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Unique identifier for this source ("MOCK", "YAHOO").
    fn id(&self) -> &'static str;

    /// Fetch the current quote for one ticker.
    async fn get_quote(&self, ticker: &str) -> Result<PriceQuote, MarketDataError>;

    /// Fetch current quotes for many tickers in one call.
    ///
    /// Tickers that cannot be priced are absent from the returned map. An
    /// `Err` means the source as a whole failed; no partial map is returned
    /// in that case.
    async fn get_batch_quotes(
        &self,
        tickers: &[String],
    ) -> Result<HashMap<String, PriceQuote>, MarketDataError>;
}
