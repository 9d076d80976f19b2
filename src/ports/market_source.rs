//! Market Source Port - Market Pricing State Interface
//!
//! Defines the trait for reading the current pricing state of a
//! known market. Discovering which markets exist is not part of this
//! port; callers ask for markets by ID.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::error::EngineResult;
use crate::domain::trade::{MarketId, MarketQuote};

/// Point-in-time view of one binary market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
  /// Market identifier.
  pub id: MarketId,
  /// Human-readable question, passed through to belief sources.
  pub question: String,
  /// Quoted YES probability.
  pub probability: f64,
  /// LMSR liquidity parameter.
  pub liquidity: f64,
  /// Whether the market has already resolved.
  pub resolved: bool,
}

impl MarketSnapshot {
  /// Validated pricing quote of this snapshot.
  ///
  /// # Errors
  /// Returns the domain error for out-of-range probability or liquidity.
  pub fn quote(&self) -> EngineResult<MarketQuote> {
    MarketQuote::new(self.probability, self.liquidity)
  }
}

/// Trait for market data providers.
///
/// Implementors may poll an API, read a cache or serve fixed
/// snapshots; the use cases never depend on transport details.
#[async_trait]
pub trait MarketSource: Send + Sync + 'static {
  /// Fetch the current snapshot of a market.
  async fn snapshot(&self, market_id: &MarketId) -> anyhow::Result<MarketSnapshot>;

  /// Check if the source is reachable.
  async fn is_healthy(&self) -> bool;
}
