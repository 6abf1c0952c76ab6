use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Decimal precision used when persisting computed values
pub const DECIMAL_PRECISION: u32 = 6;

/// Decimal precision for currency amounts at presentation/persistence time
pub const DISPLAY_DECIMAL_PRECISION: u32 = 2;

/// Below this share of the investment actually allocated, the allocation is flagged
pub const LOW_ALLOCATION_RATIO: Decimal = dec!(0.5);

/// Fewer stocks than this is flagged as concentration risk
pub const MIN_DIVERSIFIED_STOCK_COUNT: usize = 3;

/// Minimum number of stocks a constraint configuration must allow
pub const MIN_HOLDABLE_STOCKS: Decimal = dec!(2);

/// Default per-stock ceiling, percent of total investment
pub const DEFAULT_MAX_ALLOCATION_PER_STOCK: Decimal = dec!(100);

/// Default minimum allocation amount
pub const DEFAULT_MIN_ALLOCATION_AMOUNT: Decimal = Decimal::ZERO;

/// Default deadline for one batched price lookup
pub const DEFAULT_PRICE_TIMEOUT_MS: u64 = 5_000;

/// Days per year used by the simplified annualized return
pub const DAYS_PER_YEAR: Decimal = dec!(365.25);
