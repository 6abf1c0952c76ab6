//! Deterministic in-memory price source.
//!
//! Prices are whatever was seeded; unknown tickers have no price. The source
//! can be switched into an "outage" mode where every batch call fails, and
//! can be given an artificial latency to exercise caller timeouts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use rust_decimal::Decimal;

use crate::errors::MarketDataError;
use crate::models::PriceQuote;
use crate::provider::traits::PriceSource;

const PROVIDER_ID: &str = "MOCK";
const MOCK_CURRENCY: &str = "USD";

#[derive(Default)]
pub struct MockPriceSource {
    prices: RwLock<HashMap<String, Decimal>>,
    outage: AtomicBool,
    latency: Option<Duration>,
    batch_calls: AtomicUsize,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source seeded with `(ticker, price)` pairs.
    pub fn with_prices<I, S>(prices: I) -> Self
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: Into<String>,
    {
        let source = Self::new();
        {
            let mut map = source.prices.write().unwrap_or_else(|e| e.into_inner());
            for (ticker, price) in prices {
                map.insert(ticker.into(), price);
            }
        }
        source
    }

    /// Delays every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn set_price(&self, ticker: &str, price: Decimal) {
        self.prices
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(ticker.to_string(), price);
    }

    pub fn remove_price(&self, ticker: &str) {
        self.prices
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(ticker);
    }

    /// Simulates the whole source being unreachable.
    pub fn set_outage(&self, outage: bool) {
        self.outage.store(outage, Ordering::SeqCst);
    }

    /// Number of batch calls served so far.
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn check_outage(&self) -> Result<(), MarketDataError> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: "price service unavailable".to_string(),
            });
        }
        Ok(())
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn lookup(&self, ticker: &str) -> Option<Decimal> {
        self.prices
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(ticker)
            .copied()
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn get_quote(&self, ticker: &str) -> Result<PriceQuote, MarketDataError> {
        self.simulate_latency().await;
        self.check_outage()?;
        self.lookup(ticker)
            .map(|price| PriceQuote::new(ticker, price, MOCK_CURRENCY, PROVIDER_ID))
            .ok_or_else(|| MarketDataError::SymbolNotFound(ticker.to_string()))
    }

    async fn get_batch_quotes(
        &self,
        tickers: &[String],
    ) -> Result<HashMap<String, PriceQuote>, MarketDataError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.check_outage()?;

        let quotes: HashMap<String, PriceQuote> = tickers
            .iter()
            .filter_map(|ticker| {
                self.lookup(ticker).map(|price| {
                    (
                        ticker.clone(),
                        PriceQuote::new(ticker, price, MOCK_CURRENCY, PROVIDER_ID),
                    )
                })
            })
            .collect();

        debug!(
            "Mock price source served {}/{} tickers",
            quotes.len(),
            tickers.len()
        );
        Ok(quotes)
    }
}
