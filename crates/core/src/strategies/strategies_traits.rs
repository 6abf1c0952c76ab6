use crate::errors::Result;
use crate::strategies::strategies_model::Strategy;

/// Read access to strategies and their nested stock eligibility and latest
/// signals. Strategy management itself lives outside the engine.
pub trait StrategyRepositoryTrait: Send + Sync {
    /// All strategies owned by a user, in creation order.
    fn get_strategies_for_user(&self, user_id: &str) -> Result<Vec<Strategy>>;

    /// Strategies with the given ids. Unknown ids are silently skipped; the
    /// caller compares lengths when it needs to.
    fn get_strategies_by_ids(&self, strategy_ids: &[String]) -> Result<Vec<Strategy>>;
}
