//! Decision policy: turns a belief and a quote into YES / NO / SKIP and a stake.
//!
//! Materiality and confidence gates run first; surviving markets are
//! sized by the configured [`SizingStrategy`].

use serde::{Deserialize, Serialize};

use super::error::EngineResult;
use super::kelly::KellySizer;
use super::trade::{
    BeliefEstimate, BindingConstraint, Direction, MarketQuote, Outcome, SizingDiagnostics,
    SizingParameters,
};

/// Heuristic stake that scales with confidence and disagreement.
///
/// `stake = base_bet·(1 + k1·(c − 0.5))·(1 + k2·min(|q − p|, edge_cap))`,
/// clamped to `[0, max_bet]`. Ignores self-impact, so it overbets thin
/// markets; kept for comparison and for markets of unknown depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceScaling {
    /// Stake at 50% confidence and zero edge.
    pub base_bet: f64,
    /// k1.
    pub confidence_gain: f64,
    /// k2.
    pub edge_gain: f64,
    /// Disagreement beyond this earns nothing extra.
    pub edge_cap: f64,
}

impl Default for ConfidenceScaling {
    fn default() -> Self {
        Self {
            base_bet: 10.0,
            confidence_gain: 4.0,
            edge_gain: 5.0,
            edge_cap: 0.4,
        }
    }
}

impl ConfidenceScaling {
    pub fn stake(&self, confidence: f64, edge: f64, max_bet: f64) -> f64 {
        let confidence_multiplier = self.confidence_gain.mul_add(confidence - 0.5, 1.0);
        let edge_multiplier = self.edge_gain.mul_add(edge.min(self.edge_cap), 1.0);
        (self.base_bet * confidence_multiplier * edge_multiplier).clamp(0.0, max_bet)
    }
}

/// How a material, confident view is turned into a stake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SizingStrategy {
    /// Self-consistent fractional Kelly under LMSR price impact.
    #[default]
    ImpactKelly,
    /// Confidence/edge heuristic without impact awareness.
    ConfidenceScaled(ConfidenceScaling),
}

/// Gates and strategy of the policy, from the `[policy]` config table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Minimum |q − p| worth acting on.
    pub materiality_threshold: f64,
    /// Minimum belief confidence worth acting on.
    pub min_confidence: f64,
    pub strategy: SizingStrategy,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            materiality_threshold: 0.05,
            min_confidence: 0.6,
            strategy: SizingStrategy::ImpactKelly,
        }
    }
}

/// Why a market was passed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// |q − p| under the materiality threshold.
    Immaterial,
    /// Confidence under the configured minimum.
    LowConfidence,
    /// No edge left at any stake.
    NoEdge,
    /// The sized stake was under the minimum bet or zero.
    BelowMinimum,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immaterial => write!(f, "immaterial edge"),
            Self::LowConfidence => write!(f, "low confidence"),
            Self::NoEdge => write!(f, "no edge"),
            Self::BelowMinimum => write!(f, "stake below minimum"),
        }
    }
}

/// Final verdict for one market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Decision {
    pub direction: Direction,
    /// Stake to place; 0 whenever `direction` is SKIP.
    pub amount: f64,
    pub skip_reason: Option<SkipReason>,
    /// Present when the impact-aware sizer ran.
    pub sizing: Option<SizingDiagnostics>,
}

impl Decision {
    const fn skip(reason: SkipReason, sizing: Option<SizingDiagnostics>) -> Self {
        Self {
            direction: Direction::Skip,
            amount: 0.0,
            skip_reason: Some(reason),
            sizing,
        }
    }

    pub const fn is_bet(&self) -> bool {
        !self.direction.is_skip()
    }
}

/// Decision policy bound to a sizer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DecisionPolicy {
    config: PolicyConfig,
    sizer: KellySizer,
}

impl DecisionPolicy {
    pub const fn new(config: PolicyConfig, sizer: KellySizer) -> Self {
        Self { config, sizer }
    }

    pub const fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Decides direction and stake for `belief` against `quote`.
    ///
    /// # Errors
    /// Invalid beliefs, quotes or parameters and degenerate markets are
    /// returned as errors; they are never turned into a SKIP.
    pub fn decide(
        &self,
        belief: &BeliefEstimate,
        quote: &MarketQuote,
        params: &SizingParameters,
    ) -> EngineResult<Decision> {
        belief.validate()?;
        quote.validate()?;
        params.validate()?;

        let edge = belief.edge_against(quote);
        if edge < self.config.materiality_threshold {
            return Ok(Decision::skip(SkipReason::Immaterial, None));
        }
        if belief.confidence < self.config.min_confidence {
            return Ok(Decision::skip(SkipReason::LowConfidence, None));
        }

        match self.config.strategy {
            SizingStrategy::ImpactKelly => {
                let result = self.sizer.size_bet(belief, quote, params)?;
                if result.direction.is_skip() {
                    let reason = match result.diagnostics.binding {
                        BindingConstraint::NoEdge => SkipReason::NoEdge,
                        _ => SkipReason::BelowMinimum,
                    };
                    return Ok(Decision::skip(reason, Some(result.diagnostics)));
                }
                Ok(Decision {
                    direction: result.direction,
                    amount: result.amount,
                    skip_reason: None,
                    sizing: Some(result.diagnostics),
                })
            }
            SizingStrategy::ConfidenceScaled(scaling) => {
                let amount = scaling.stake(belief.confidence, edge, params.max_bet);
                if amount <= 0.0 {
                    return Ok(Decision::skip(SkipReason::BelowMinimum, None));
                }
                let outcome = if belief.true_probability > quote.probability() {
                    Outcome::Yes
                } else {
                    Outcome::No
                };
                Ok(Decision {
                    direction: Direction::from(outcome),
                    amount,
                    skip_reason: None,
                    sizing: None,
                })
            }
        }
    }
}

/// Decides with the default policy and sizer.
///
/// # Errors
/// See [`DecisionPolicy::decide`].
pub fn decide(
    belief: &BeliefEstimate,
    quote: &MarketQuote,
    params: &SizingParameters,
) -> EngineResult<Decision> {
    DecisionPolicy::default().decide(belief, quote, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::EngineError;

    fn quote(p: f64, b: f64) -> MarketQuote {
        MarketQuote::new(p, b).unwrap()
    }

    #[test]
    fn test_equal_belief_skips_with_zero() {
        let belief = BeliefEstimate::new(0.5, 1.0).unwrap();
        let decision = decide(&belief, &quote(0.5, 100.0), &SizingParameters::default()).unwrap();
        assert_eq!(decision.direction, Direction::Skip);
        assert_eq!(decision.amount, 0.0);
        assert_eq!(decision.skip_reason, Some(SkipReason::Immaterial));
    }

    #[test]
    fn test_small_disagreement_is_immaterial() {
        let belief = BeliefEstimate::new(0.53, 0.9).unwrap();
        let decision = decide(&belief, &quote(0.5, 100.0), &SizingParameters::default()).unwrap();
        assert_eq!(decision.skip_reason, Some(SkipReason::Immaterial));
    }

    #[test]
    fn test_low_confidence_skips() {
        let belief = BeliefEstimate::new(0.8, 0.4).unwrap();
        let decision = decide(&belief, &quote(0.5, 100.0), &SizingParameters::default()).unwrap();
        assert_eq!(decision.skip_reason, Some(SkipReason::LowConfidence));
        assert!(!decision.is_bet());
    }

    #[test]
    fn test_impact_kelly_bets_no_when_overpriced() {
        let belief = BeliefEstimate::new(0.3, 0.8).unwrap();
        let decision = decide(&belief, &quote(0.6, 100.0), &SizingParameters::default()).unwrap();
        assert_eq!(decision.direction, Direction::No);
        assert!(decision.amount >= 2.0 && decision.amount <= 50.0);
        assert!(decision.sizing.is_some());
    }

    #[test]
    fn test_thin_market_below_minimum_reports_reason() {
        let belief = BeliefEstimate::new(0.9, 0.9).unwrap();
        let decision = decide(&belief, &quote(0.5, 1.0), &SizingParameters::default()).unwrap();
        assert_eq!(decision.skip_reason, Some(SkipReason::BelowMinimum));
        assert_eq!(
            decision.sizing.map(|d| d.binding),
            Some(BindingConstraint::BelowMinimum)
        );
    }

    #[test]
    fn test_confidence_scaled_stake() {
        let scaling = ConfidenceScaling::default();
        // 10 · (1 + 4·0.3) · (1 + 5·0.2)
        assert!((scaling.stake(0.8, 0.2, 50.0) - 44.0).abs() < 1e-9);
        // Edge capped at 0.4 and stake capped at max_bet.
        assert!((scaling.stake(1.0, 0.5, 50.0) - 50.0).abs() < 1e-9);
        assert!((scaling.stake(1.0, 0.5, 100.0) - 90.0).abs() < 1e-9);
        assert_eq!(scaling.stake(0.2, 0.3, 50.0), 0.0);
    }

    #[test]
    fn test_confidence_scaled_ignores_liquidity() {
        let policy = DecisionPolicy::new(
            PolicyConfig {
                strategy: SizingStrategy::ConfidenceScaled(ConfidenceScaling::default()),
                ..PolicyConfig::default()
            },
            KellySizer::default(),
        );
        let belief = BeliefEstimate::new(0.7, 0.8).unwrap();
        let params = SizingParameters::default();
        let thin = policy.decide(&belief, &quote(0.5, 1.0), &params).unwrap();
        let deep = policy.decide(&belief, &quote(0.5, 10_000.0), &params).unwrap();
        assert_eq!(thin.direction, Direction::Yes);
        assert!((thin.amount - deep.amount).abs() < 1e-12);
        assert!(thin.sizing.is_none());
    }

    #[test]
    fn test_invalid_belief_propagates() {
        let belief = BeliefEstimate {
            true_probability: 1.5,
            confidence: 0.9,
        };
        let err = decide(&belief, &quote(0.5, 100.0), &SizingParameters::default()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { .. }));
    }

    #[test]
    fn test_strategy_deserializes_from_tagged_table() {
        let config: PolicyConfig = toml::from_str(
            r#"
            materiality_threshold = 0.1
            [strategy]
            kind = "confidence_scaled"
            base_bet = 5.0
            "#,
        )
        .unwrap();
        assert!((config.materiality_threshold - 0.1).abs() < f64::EPSILON);
        assert!((config.min_confidence - 0.6).abs() < f64::EPSILON);
        match config.strategy {
            SizingStrategy::ConfidenceScaled(scaling) => {
                assert!((scaling.base_bet - 5.0).abs() < f64::EPSILON);
                assert!((scaling.edge_gain - 5.0).abs() < f64::EPSILON);
            }
            SizingStrategy::ImpactKelly => panic!("expected confidence_scaled"),
        }
    }
}
