//! Belief Sources - Fixed Tables, Simple Rules and Closures
//!
//! Three interchangeable `BeliefSource` implementations:
//! - `FixedBelief`: per-market beliefs read from `config.toml`
//! - `ThresholdRule`: treats long shots below a floor as underpriced
//!   (and favourites above the mirrored ceiling as overpriced)
//! - `CallbackBelief`: wraps any closure over a market snapshot

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::MarketConfig;
use crate::domain::trade::{BeliefEstimate, MarketId};
use crate::ports::belief::{BeliefSource, ElicitedBelief};
use crate::ports::market_source::MarketSnapshot;

// ────────────────────────────────────────────
// FixedBelief
// ────────────────────────────────────────────

/// Beliefs looked up by market ID.
pub struct FixedBelief {
    beliefs: HashMap<MarketId, ElicitedBelief>,
}

impl FixedBelief {
    pub fn new(beliefs: impl IntoIterator<Item = (MarketId, ElicitedBelief)>) -> Self {
        Self {
            beliefs: beliefs.into_iter().collect(),
        }
    }

    /// Build from the `[[markets]]` entries that carry a `belief`.
    ///
    /// # Errors
    /// Fails if a configured belief or confidence is out of range.
    pub fn from_config(markets: &[MarketConfig]) -> Result<Self> {
        let mut beliefs = HashMap::new();
        for market in markets {
            let Some(q) = market.belief else { continue };
            let belief = BeliefEstimate::new(q, market.confidence)
                .with_context(|| format!("Invalid belief for market {}", market.id))?;
            let rationale = market
                .rationale
                .clone()
                .unwrap_or_else(|| "configured belief".to_string());
            beliefs.insert(market.id.clone(), ElicitedBelief { belief, rationale });
        }
        Ok(Self { beliefs })
    }

    pub fn len(&self) -> usize {
        self.beliefs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beliefs.is_empty()
    }
}

#[async_trait]
impl BeliefSource for FixedBelief {
    async fn estimate(&self, market: &MarketSnapshot) -> Result<ElicitedBelief> {
        self.beliefs
            .get(&market.id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No belief configured for market {}", market.id))
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

// ────────────────────────────────────────────
// ThresholdRule
// ────────────────────────────────────────────

/// Rule-based belief: long shots are worth more than quoted.
///
/// Below `floor` the believed probability is the quote plus `nudge`;
/// above `1 - floor` it is the quote minus `nudge`. In between the rule
/// has no view and echoes the quote with zero confidence.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ThresholdRule {
    pub floor: f64,
    pub nudge: f64,
    pub confidence: f64,
}

impl Default for ThresholdRule {
    fn default() -> Self {
        Self {
            floor: 0.2,
            nudge: 0.1,
            confidence: 0.7,
        }
    }
}

impl ThresholdRule {
    fn believe(&self, p: f64) -> (f64, f64, &'static str) {
        if p < self.floor {
            ((p + self.nudge).min(0.99), self.confidence, "long shot below floor")
        } else if p > 1.0 - self.floor {
            ((p - self.nudge).max(0.01), self.confidence, "favourite above ceiling")
        } else {
            (p, 0.0, "no view inside band")
        }
    }
}

#[async_trait]
impl BeliefSource for ThresholdRule {
    async fn estimate(&self, market: &MarketSnapshot) -> Result<ElicitedBelief> {
        let (q, confidence, why) = self.believe(market.probability);
        debug!(market = %market.id, p = market.probability, q, "Threshold rule applied");
        Ok(ElicitedBelief {
            belief: BeliefEstimate::new(q, confidence)?,
            rationale: why.to_string(),
        })
    }

    fn name(&self) -> &str {
        "threshold"
    }
}

// ────────────────────────────────────────────
// CallbackBelief
// ────────────────────────────────────────────

/// Closure-backed belief source.
///
/// The closure returns `(probability, confidence, rationale)`.
pub struct CallbackBelief<F> {
    name: String,
    callback: F,
}

impl<F> CallbackBelief<F>
where
    F: Fn(&MarketSnapshot) -> Result<(f64, f64, String)> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }
}

#[async_trait]
impl<F> BeliefSource for CallbackBelief<F>
where
    F: Fn(&MarketSnapshot) -> Result<(f64, f64, String)> + Send + Sync + 'static,
{
    async fn estimate(&self, market: &MarketSnapshot) -> Result<ElicitedBelief> {
        let (q, confidence, rationale) = (self.callback)(market)?;
        Ok(ElicitedBelief {
            belief: BeliefEstimate::new(q, confidence)?,
            rationale,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: &str, p: f64) -> MarketSnapshot {
        MarketSnapshot {
            id: id.to_string(),
            question: String::new(),
            probability: p,
            liquidity: 100.0,
            resolved: false,
        }
    }

    #[tokio::test]
    async fn test_fixed_belief_from_config() {
        let markets = vec![
            MarketConfig {
                id: "with".to_string(),
                question: String::new(),
                probability: 0.5,
                liquidity: 100.0,
                resolved: false,
                belief: Some(0.7),
                confidence: 0.8,
                rationale: None,
            },
            MarketConfig {
                id: "without".to_string(),
                question: String::new(),
                probability: 0.5,
                liquidity: 100.0,
                resolved: false,
                belief: None,
                confidence: 0.7,
                rationale: None,
            },
        ];
        let source = FixedBelief::from_config(&markets).unwrap();
        assert_eq!(source.len(), 1);

        let estimate = source.estimate(&snapshot("with", 0.5)).await.unwrap();
        assert!((estimate.belief.true_probability - 0.7).abs() < f64::EPSILON);
        assert!((estimate.belief.confidence - 0.8).abs() < f64::EPSILON);
        assert!(source.estimate(&snapshot("without", 0.5)).await.is_err());
    }

    #[tokio::test]
    async fn test_threshold_rule_bands() {
        let rule = ThresholdRule::default();

        let low = rule.estimate(&snapshot("a", 0.1)).await.unwrap();
        assert!((low.belief.true_probability - 0.2).abs() < 1e-12);
        assert!((low.belief.confidence - 0.7).abs() < f64::EPSILON);

        let high = rule.estimate(&snapshot("b", 0.9)).await.unwrap();
        assert!((high.belief.true_probability - 0.8).abs() < 1e-12);

        let mid = rule.estimate(&snapshot("c", 0.5)).await.unwrap();
        assert!((mid.belief.true_probability - 0.5).abs() < f64::EPSILON);
        assert_eq!(mid.belief.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_callback_belief_validates_output() {
        let source = CallbackBelief::new("contrarian", |m: &MarketSnapshot| {
            Ok((1.0 - m.probability, 0.9, "flip".to_string()))
        });
        assert_eq!(source.name(), "contrarian");
        let estimate = source.estimate(&snapshot("a", 0.3)).await.unwrap();
        assert!((estimate.belief.true_probability - 0.7).abs() < 1e-12);

        let broken = CallbackBelief::new("broken", |_: &MarketSnapshot| {
            Ok((1.5, 0.9, String::new()))
        });
        assert!(broken.estimate(&snapshot("a", 0.3)).await.is_err());
    }
}
