//! Static Market Source - Config-backed Market Snapshots
//!
//! Serves the markets listed in `config.toml` as fixed snapshots.
//! Useful for paper runs and replaying a hand-picked set of quotes
//! through the sizing engine.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::MarketConfig;
use crate::domain::trade::MarketId;
use crate::ports::market_source::{MarketSnapshot, MarketSource};

/// In-memory market source.
pub struct StaticMarketSource {
    /// Snapshots keyed by market ID.
    markets: HashMap<MarketId, MarketSnapshot>,
}

impl StaticMarketSource {
    /// Create a source serving the given snapshots.
    pub fn new(snapshots: impl IntoIterator<Item = MarketSnapshot>) -> Self {
        let markets = snapshots
            .into_iter()
            .map(|snapshot| (snapshot.id.clone(), snapshot))
            .collect();
        Self { markets }
    }

    /// Create a source from the `[[markets]]` config entries.
    pub fn from_config(markets: &[MarketConfig]) -> Self {
        Self::new(markets.iter().map(|m| MarketSnapshot {
            id: m.id.clone(),
            question: m.question.clone(),
            probability: m.probability,
            liquidity: m.liquidity,
            resolved: m.resolved,
        }))
    }
}

#[async_trait]
impl MarketSource for StaticMarketSource {
    async fn snapshot(&self, market_id: &MarketId) -> Result<MarketSnapshot> {
        self.markets
            .get(market_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Unknown market: {market_id}"))
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}
