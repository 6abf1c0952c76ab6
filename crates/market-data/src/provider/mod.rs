//! Price source implementations.

pub mod mock;
pub mod traits;
pub mod yahoo;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;

pub use mock::MockPriceSource;
pub use traits::PriceSource;
pub use yahoo::YahooPriceSource;

/// Which price source variant to build. Selected by the configuration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PriceSourceKind {
    #[default]
    Mock,
    Live,
}

impl FromStr for PriceSourceKind {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(PriceSourceKind::Mock),
            "live" | "yahoo" => Ok(PriceSourceKind::Live),
            other => Err(MarketDataError::UnknownSource(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_source_kind() {
        assert_eq!("mock".parse::<PriceSourceKind>(), Ok(PriceSourceKind::Mock));
        assert_eq!(" LIVE ".parse::<PriceSourceKind>(), Ok(PriceSourceKind::Live));
        assert_eq!("yahoo".parse::<PriceSourceKind>(), Ok(PriceSourceKind::Live));
        assert!("bloomberg".parse::<PriceSourceKind>().is_err());
    }
}
