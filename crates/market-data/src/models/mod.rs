//! Price models shared by every price source.

mod quote;

pub use quote::PriceQuote;
