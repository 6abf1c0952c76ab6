use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Latest price for a ticker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    /// Ticker the quote was requested for
    pub ticker: String,

    /// Last traded / closing price
    pub price: Decimal,

    /// Quote currency
    pub currency: String,

    /// Timestamp of the quote
    pub timestamp: DateTime<Utc>,

    /// Source of the quote (MOCK, YAHOO)
    pub source: String,
}

impl PriceQuote {
    pub fn new(ticker: &str, price: Decimal, currency: &str, source: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            price,
            currency: currency.to_string(),
            timestamp: Utc::now(),
            source: source.to_string(),
        }
    }
}
