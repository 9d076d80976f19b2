//! Belief Source Port - Probability Estimate Interface
//!
//! A belief source looks at a market and returns its own probability
//! for YES plus a confidence. Implementations are independent
//! strategies (fixed tables, simple rules, closures, remote models)
//! composed by the session rather than layered by inheritance.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::trade::BeliefEstimate;
use crate::ports::market_source::MarketSnapshot;

/// A belief together with the reasoning behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElicitedBelief {
  pub belief: BeliefEstimate,
  /// Free-form explanation, logged with the decision.
  pub rationale: String,
}

/// Trait for belief providers.
#[async_trait]
pub trait BeliefSource: Send + Sync + 'static {
  /// Estimate the YES probability of `market`.
  ///
  /// # Errors
  /// Returns error if no estimate can be produced for this market.
  async fn estimate(&self, market: &MarketSnapshot) -> anyhow::Result<ElicitedBelief>;

  /// Short identifier used in logs.
  fn name(&self) -> &str;
}
