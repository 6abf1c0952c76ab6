//! Yahoo Finance price source.
//!
//! Batches are fanned out as concurrent single-ticker requests, each bounded
//! by its own timeout. A ticker that times out, is unknown, or returns an
//! unusable price is left out of the batch result. The batch itself fails only
//! when no ticker could be fetched because Yahoo is unreachable.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::future::join_all;
use log::{debug, warn};
use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use yahoo_finance_api as yahoo;

use crate::errors::MarketDataError;
use crate::models::PriceQuote;
use crate::provider::traits::PriceSource;

const PROVIDER_ID: &str = "YAHOO";
const DEFAULT_CURRENCY: &str = "USD";

/// Yahoo Finance price source.
pub struct YahooPriceSource {
    connector: yahoo::YahooConnector,
    ticker_timeout: Duration,
}

impl YahooPriceSource {
    /// Create a new Yahoo Finance source with a per-ticker timeout.
    pub fn new(ticker_timeout: Duration) -> Result<Self, MarketDataError> {
        let connector =
            yahoo::YahooConnector::new().map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to initialize Yahoo connector: {}", e),
            })?;
        Ok(Self {
            connector,
            ticker_timeout,
        })
    }

    async fn fetch_latest(&self, ticker: &str) -> Result<PriceQuote, MarketDataError> {
        let response = self
            .connector
            .get_latest_quotes(ticker, "1d")
            .await
            .map_err(|e| map_yahoo_error(ticker, e))?;

        let quote = response.last_quote().map_err(|e| {
            warn!("No quotes returned for {}: {}", ticker, e);
            MarketDataError::SymbolNotFound(ticker.to_string())
        })?;

        to_price_quote(ticker, quote.close, quote.timestamp as i64)
    }
}

fn map_yahoo_error(ticker: &str, error: yahoo::YahooError) -> MarketDataError {
    if matches!(
        error,
        yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult
    ) {
        return MarketDataError::SymbolNotFound(ticker.to_string());
    }
    let message = error.to_string();
    if message.contains("429") {
        MarketDataError::RateLimited {
            provider: PROVIDER_ID.to_string(),
        }
    } else {
        MarketDataError::ProviderError {
            provider: PROVIDER_ID.to_string(),
            message,
        }
    }
}

/// Converts a raw Yahoo close/timestamp pair into a validated quote.
fn to_price_quote(ticker: &str, close: f64, timestamp: i64) -> Result<PriceQuote, MarketDataError> {
    let timestamp: DateTime<Utc> = Utc.timestamp_opt(timestamp, 0).single().ok_or_else(|| {
        MarketDataError::ValidationFailed {
            message: format!("Invalid timestamp {} for {}", timestamp, ticker),
        }
    })?;

    let price = Decimal::from_f64(close)
        .filter(|p| *p > Decimal::ZERO)
        .ok_or_else(|| MarketDataError::ValidationFailed {
            message: format!("Unusable close price {} for {}", close, ticker),
        })?;

    Ok(PriceQuote {
        ticker: ticker.to_string(),
        price,
        currency: DEFAULT_CURRENCY.to_string(),
        timestamp,
        source: PROVIDER_ID.to_string(),
    })
}

#[async_trait]
impl PriceSource for YahooPriceSource {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn get_quote(&self, ticker: &str) -> Result<PriceQuote, MarketDataError> {
        match tokio::time::timeout(self.ticker_timeout, self.fetch_latest(ticker)).await {
            Ok(result) => result,
            Err(_) => Err(MarketDataError::Timeout {
                provider: PROVIDER_ID.to_string(),
            }),
        }
    }

    async fn get_batch_quotes(
        &self,
        tickers: &[String],
    ) -> Result<HashMap<String, PriceQuote>, MarketDataError> {
        let results = join_all(tickers.iter().map(|ticker| self.get_quote(ticker))).await;

        let mut quotes = HashMap::with_capacity(tickers.len());
        let mut source_failure: Option<MarketDataError> = None;

        for (ticker, result) in tickers.iter().zip(results) {
            match result {
                Ok(quote) => {
                    quotes.insert(ticker.clone(), quote);
                }
                Err(e) if e.is_ticker_unavailable() => {
                    warn!("Price unavailable for {}: {}", ticker, e);
                }
                Err(e) => {
                    warn!("Yahoo request for {} failed: {}", ticker, e);
                    source_failure.get_or_insert(e);
                }
            }
        }

        if quotes.is_empty() {
            if let Some(e) = source_failure {
                return Err(e);
            }
        }

        debug!(
            "Yahoo served {}/{} tickers",
            quotes.len(),
            tickers.len()
        );
        Ok(quotes)
    }
}
