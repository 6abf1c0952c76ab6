//! Strategy domain models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a strategy's weight is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightMode {
    /// `weight_value` is a percentage of the total investment.
    Percent,
    /// `weight_value` is a fixed currency amount.
    Budget,
}

impl WeightMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightMode::Percent => "percent",
            WeightMode::Budget => "budget",
        }
    }
}

impl std::str::FromStr for WeightMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percent" => Ok(WeightMode::Percent),
            "budget" => Ok(WeightMode::Budget),
            other => Err(format!("Unknown weight mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Hold,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Hold => "HOLD",
        }
    }
}

impl std::str::FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Ok(Signal::Buy),
            "HOLD" => Ok(Signal::Hold),
            other => Err(format!("Unknown signal '{}'", other)),
        }
    }
}

/// A dated signal for a stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSignal {
    pub signal: Signal,
    pub signal_date: NaiveDate,
}

/// Picks the authoritative signal: the one with the latest date.
pub fn latest_signal<'a, I>(signals: I) -> Option<&'a StockSignal>
where
    I: IntoIterator<Item = &'a StockSignal>,
{
    signals.into_iter().max_by_key(|s| s.signal_date)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    pub id: String,
    pub ticker: String,
    pub name: String,
}

/// A stock's membership in a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyStock {
    pub stock: Stock,
    pub eligible: bool,
    /// Most recent signal for the stock, if any was ever recorded.
    pub signal: Option<StockSignal>,
}

impl StrategyStock {
    /// Eligible in this strategy and currently signalled Buy.
    pub fn is_candidate(&self) -> bool {
        self.eligible && matches!(self.signal.as_ref().map(|s| s.signal), Some(Signal::Buy))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub weight_mode: WeightMode,
    pub weight_value: Decimal,
    pub created_at: DateTime<Utc>,
    pub stocks: Vec<StrategyStock>,
}

impl Strategy {
    pub fn candidates(&self) -> impl Iterator<Item = &StrategyStock> {
        self.stocks.iter().filter(|s| s.is_candidate())
    }
}

/// Orders strategies by creation time, breaking ties by id.
pub fn sort_by_creation(strategies: &mut [Strategy]) {
    strategies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}
