//! Environment configuration for the daemon.
//!
//! A `.env` file next to the binary is loaded first when present; variables
//! already set in the environment win.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use rust_decimal::Decimal;
use stratfolio_core::allocation::{validate_constraint_bounds, AllocationConstraints};
use stratfolio_core::settings::EngineSettings;
use stratfolio_market_data::PriceSourceKind;

const DEFAULT_DB_PATH: &str = "./db/app.db";
const DEFAULT_PRICE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_NAV_INTERVAL_SECS: u64 = 60 * 60;
const DEFAULT_NAV_INITIAL_DELAY_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: String,
    pub price_source: PriceSourceKind,
    pub price_timeout: Duration,
    pub nav_interval: Duration,
    pub nav_initial_delay: Duration,
    pub default_constraints: AllocationConstraints,
    /// Seed prices for the mock source
    pub mock_prices: Vec<(String, Decimal)>,
    pub log_format: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // Missing .env is fine.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AllocationConstraints::default();

        let config = Self {
            db_path: lookup("SF_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            price_source: match lookup("SF_PRICE_SOURCE") {
                Some(raw) => raw.parse().map_err(|e| anyhow!("SF_PRICE_SOURCE: {}", e))?,
                None => PriceSourceKind::default(),
            },
            price_timeout: Duration::from_millis(parse_or(
                &lookup,
                "SF_PRICE_TIMEOUT_MS",
                DEFAULT_PRICE_TIMEOUT_MS,
            )?),
            nav_interval: Duration::from_secs(parse_or(
                &lookup,
                "SF_NAV_INTERVAL_SECS",
                DEFAULT_NAV_INTERVAL_SECS,
            )?),
            nav_initial_delay: Duration::from_secs(parse_or(
                &lookup,
                "SF_NAV_INITIAL_DELAY_SECS",
                DEFAULT_NAV_INITIAL_DELAY_SECS,
            )?),
            default_constraints: AllocationConstraints::new(
                parse_or(
                    &lookup,
                    "SF_MAX_ALLOCATION_PER_STOCK",
                    defaults.max_allocation_per_stock,
                )?,
                parse_or(
                    &lookup,
                    "SF_MIN_ALLOCATION_AMOUNT",
                    defaults.min_allocation_amount,
                )?,
            ),
            mock_prices: match lookup("SF_MOCK_PRICES") {
                Some(raw) => parse_mock_prices(&raw)?,
                None => Vec::new(),
            },
            log_format: lookup("SF_LOG_FORMAT").unwrap_or_else(|| "text".to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the daemon cannot run with. The default constraints
    /// must pass the same range checks as a request's constraints.
    fn validate(&self) -> anyhow::Result<()> {
        if self.price_timeout.is_zero() {
            return Err(anyhow!("SF_PRICE_TIMEOUT_MS must be greater than zero"));
        }
        if self.nav_interval.is_zero() {
            return Err(anyhow!("SF_NAV_INTERVAL_SECS must be greater than zero"));
        }
        if let Some(violation) = validate_constraint_bounds(&self.default_constraints)
            .into_iter()
            .next()
        {
            return Err(anyhow!("Invalid default constraints: {}", violation.message));
        }
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings::default()
            .with_price_timeout(self.price_timeout)
            .with_default_constraints(self.default_constraints)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} has invalid value '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}

/// Parses `AAPL=150.50,MSFT=400` into ticker/price pairs.
fn parse_mock_prices(raw: &str) -> anyhow::Result<Vec<(String, Decimal)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (ticker, price) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("SF_MOCK_PRICES entry '{}' is not TICKER=price", pair))?;
            let price = Decimal::from_str(price.trim())
                .with_context(|| format!("SF_MOCK_PRICES price for {}", ticker.trim()))?;
            Ok((ticker.trim().to_uppercase(), price))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db_path, "./db/app.db");
        assert_eq!(config.price_source, PriceSourceKind::Mock);
        assert_eq!(config.price_timeout, Duration::from_millis(5000));
        assert_eq!(config.nav_interval, Duration::from_secs(3600));
        assert_eq!(config.nav_initial_delay, Duration::from_secs(30));
        assert_eq!(config.default_constraints, AllocationConstraints::default());
        assert!(config.mock_prices.is_empty());
        assert_eq!(config.log_format, "text");
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("SF_PRICE_SOURCE", "live"),
            ("SF_PRICE_TIMEOUT_MS", "250"),
            ("SF_MAX_ALLOCATION_PER_STOCK", "20"),
            ("SF_MIN_ALLOCATION_AMOUNT", "500.50"),
            ("SF_MOCK_PRICES", "aapl=150.50, GOOGL=2800.75,"),
        ]))
        .unwrap();

        assert_eq!(config.price_source, PriceSourceKind::Live);
        assert_eq!(config.price_timeout, Duration::from_millis(250));
        assert_eq!(
            config.default_constraints,
            AllocationConstraints::new(dec!(20), dec!(500.50))
        );
        assert_eq!(
            config.mock_prices,
            vec![
                ("AAPL".to_string(), dec!(150.50)),
                ("GOOGL".to_string(), dec!(2800.75)),
            ]
        );

        let settings = config.engine_settings();
        assert_eq!(settings.price_timeout, Duration::from_millis(250));
        assert_eq!(settings.default_constraints.max_allocation_per_stock, dec!(20));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Config::from_lookup(lookup(&[("SF_PRICE_SOURCE", "bloomberg")])).is_err());
        assert!(Config::from_lookup(lookup(&[("SF_NAV_INTERVAL_SECS", "hourly")])).is_err());
        assert!(Config::from_lookup(lookup(&[("SF_MOCK_PRICES", "AAPL:150")])).is_err());
        assert!(Config::from_lookup(lookup(&[("SF_MOCK_PRICES", "AAPL=abc")])).is_err());
    }

    #[test]
    fn test_unusable_durations_are_rejected() {
        let err = Config::from_lookup(lookup(&[("SF_NAV_INTERVAL_SECS", "0")])).unwrap_err();
        assert!(err.to_string().contains("SF_NAV_INTERVAL_SECS"));
        let err = Config::from_lookup(lookup(&[("SF_PRICE_TIMEOUT_MS", "0")])).unwrap_err();
        assert!(err.to_string().contains("SF_PRICE_TIMEOUT_MS"));

        let no_delay = Config::from_lookup(lookup(&[("SF_NAV_INITIAL_DELAY_SECS", "0")])).unwrap();
        assert!(no_delay.nav_initial_delay.is_zero());
    }

    #[test]
    fn test_out_of_range_default_constraints_are_rejected() {
        for vars in [
            [("SF_MAX_ALLOCATION_PER_STOCK", "0")],
            [("SF_MAX_ALLOCATION_PER_STOCK", "150")],
            [("SF_MIN_ALLOCATION_AMOUNT", "-1")],
        ] {
            let err = Config::from_lookup(lookup(&vars)).unwrap_err();
            assert!(err.to_string().contains("Invalid default constraints"));
        }

        let full = Config::from_lookup(lookup(&[("SF_MAX_ALLOCATION_PER_STOCK", "100")])).unwrap();
        assert_eq!(full.default_constraints.max_allocation_per_stock, dec!(100));
    }
}
