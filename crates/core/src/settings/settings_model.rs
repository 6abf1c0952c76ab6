use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::allocation::AllocationConstraints;
use crate::constants::DEFAULT_PRICE_TIMEOUT_MS;

/// Runtime knobs for the allocation engine and the portfolio service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    /// Deadline for one batched price lookup
    pub price_timeout: Duration,
    /// Constraints used when a request does not carry its own
    pub default_constraints: AllocationConstraints,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            price_timeout: Duration::from_millis(DEFAULT_PRICE_TIMEOUT_MS),
            default_constraints: AllocationConstraints::default(),
        }
    }
}

impl EngineSettings {
    pub fn with_price_timeout(mut self, price_timeout: Duration) -> Self {
        self.price_timeout = price_timeout;
        self
    }

    pub fn with_default_constraints(mut self, constraints: AllocationConstraints) -> Self {
        self.default_constraints = constraints;
        self
    }
}
