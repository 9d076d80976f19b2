//! Core trading domain types.
//!
//! Defines the value objects shared by the pricing model, the sizing
//! engine and the decision policy: quotes, trades, beliefs, sizing
//! parameters and their results.
//!
//! All probabilities are YES probabilities. A NO trade is expressed by
//! its `Outcome`, never by handing the engine `1 - p`.

use serde::{Deserialize, Serialize};

use super::error::{EngineError, EngineResult};

// ────────────────────────────────────────────
// Type aliases consumed by ports and adapters
// ────────────────────────────────────────────

/// Lightweight market identifier used at the ports boundary.
pub type MarketId = String;

// ────────────────────────────────────────────
// Enums shared across domain and ports
// ────────────────────────────────────────────

/// One side of a binary market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Yes,
    No,
}

impl Outcome {
    /// The outcome on the other side of the book.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Yes => Self::No,
            Self::No => Self::Yes,
        }
    }

    /// Maps a YES probability into this outcome's own probability space.
    ///
    /// The map is an involution, so it also maps back.
    pub fn side_probability(self, yes_probability: f64) -> f64 {
        match self {
            Self::Yes => yes_probability,
            Self::No => 1.0 - yes_probability,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yes => write!(f, "YES"),
            Self::No => write!(f, "NO"),
        }
    }
}

/// What the policy wants to do with a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Yes,
    No,
    Skip,
}

impl Direction {
    /// The outcome to buy, if any.
    pub const fn outcome(self) -> Option<Outcome> {
        match self {
            Self::Yes => Some(Outcome::Yes),
            Self::No => Some(Outcome::No),
            Self::Skip => None,
        }
    }

    pub const fn is_skip(self) -> bool {
        matches!(self, Self::Skip)
    }
}

impl From<Outcome> for Direction {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Yes => Self::Yes,
            Outcome::No => Self::No,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yes => write!(f, "YES"),
            Self::No => write!(f, "NO"),
            Self::Skip => write!(f, "SKIP"),
        }
    }
}

// ────────────────────────────────────────────
// Market state and trades
// ────────────────────────────────────────────

/// Immutable pricing snapshot of one LMSR market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketQuote {
    probability: f64,
    liquidity: f64,
}

impl MarketQuote {
    /// Creates a quote from a YES probability and a liquidity parameter `b`.
    ///
    /// # Errors
    /// `InvalidInput` if `probability` is not strictly inside (0, 1),
    /// `InvalidConfiguration` if `liquidity` is not a positive finite number.
    pub fn new(probability: f64, liquidity: f64) -> EngineResult<Self> {
        let quote = Self {
            probability,
            liquidity,
        };
        quote.validate()?;
        Ok(quote)
    }

    /// Quoted YES probability.
    pub const fn probability(&self) -> f64 {
        self.probability
    }

    /// LMSR liquidity parameter `b`.
    pub const fn liquidity(&self) -> f64 {
        self.liquidity
    }

    pub(crate) fn validate(&self) -> EngineResult<()> {
        if !(self.liquidity.is_finite() && self.liquidity > 0.0) {
            return Err(EngineError::invalid_config(format!(
                "liquidity parameter must be positive, got {}",
                self.liquidity
            )));
        }
        ensure_open_unit(self.probability, "market probability")
    }
}

/// A hypothetical or intended purchase of one outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Amount of currency spent (M >= 0).
    pub amount: f64,
    /// Outcome being bought.
    pub outcome: Outcome,
}

impl Trade {
    pub const fn new(amount: f64, outcome: Outcome) -> Self {
        Self { amount, outcome }
    }

    pub const fn yes(amount: f64) -> Self {
        Self::new(amount, Outcome::Yes)
    }

    pub const fn no(amount: f64) -> Self {
        Self::new(amount, Outcome::No)
    }
}

/// Effect of a trade on the market. Always derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradeImpact {
    /// Shares of the traded outcome acquired (δ).
    pub shares: f64,
    /// YES probability after the trade (p′).
    pub post_trade_probability: f64,
    /// Average YES-equivalent probability paid across the trade (m).
    pub marginal_probability: f64,
    /// Signed move of the YES probability (p′ − p).
    pub price_impact: f64,
}

/// An externally elicited view on a market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeliefEstimate {
    /// Believed YES probability (q).
    pub true_probability: f64,
    /// Self-reported confidence in [0, 1].
    pub confidence: f64,
}

impl BeliefEstimate {
    /// # Errors
    /// `InvalidInput` if `q` is outside (0, 1) or `confidence` outside [0, 1].
    pub fn new(true_probability: f64, confidence: f64) -> EngineResult<Self> {
        let belief = Self {
            true_probability,
            confidence,
        };
        belief.validate()?;
        Ok(belief)
    }

    /// Absolute disagreement with a quoted probability.
    pub fn edge_against(&self, quote: &MarketQuote) -> f64 {
        (self.true_probability - quote.probability()).abs()
    }

    pub(crate) fn validate(&self) -> EngineResult<()> {
        ensure_open_unit(self.true_probability, "believed probability")?;
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(EngineError::invalid_input(format!(
                "confidence must be in [0, 1], got {}",
                self.confidence
            )));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────
// Sizing inputs and outputs
// ────────────────────────────────────────────

/// Knobs of the impact-aware Kelly sizer.
///
/// This is the only persisted configuration surface of the core and is
/// loaded straight from the `[sizing]` table of `config.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingParameters {
    /// Kelly multiplier in (0, 1] (0.25 = quarter-Kelly).
    pub kelly_fraction: f64,
    /// Largest tolerated move of the quoted probability, in (0, 1).
    pub max_probability_impact: f64,
    /// Stakes below this are not worth placing.
    pub min_bet: f64,
    /// Hard cap on a single stake.
    pub max_bet: f64,
    /// Point-in-time bankroll used for this sizing call.
    pub bankroll: f64,
}

impl Default for SizingParameters {
    fn default() -> Self {
        Self {
            kelly_fraction: 0.25,
            max_probability_impact: 0.05,
            min_bet: 2.0,
            max_bet: 50.0,
            bankroll: 1000.0,
        }
    }
}

impl SizingParameters {
    /// Same parameters with a different bankroll.
    #[must_use]
    pub const fn with_bankroll(mut self, bankroll: f64) -> Self {
        self.bankroll = bankroll;
        self
    }

    /// # Errors
    /// `InvalidConfiguration` naming the first offending field.
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.kelly_fraction > 0.0 && self.kelly_fraction <= 1.0) {
            return Err(EngineError::invalid_config(format!(
                "kelly_fraction must be in (0, 1], got {}",
                self.kelly_fraction
            )));
        }
        if !(self.max_probability_impact > 0.0 && self.max_probability_impact < 1.0) {
            return Err(EngineError::invalid_config(format!(
                "max_probability_impact must be in (0, 1), got {}",
                self.max_probability_impact
            )));
        }
        if !(self.min_bet.is_finite() && self.min_bet >= 0.0) {
            return Err(EngineError::invalid_config(format!(
                "min_bet must be non-negative, got {}",
                self.min_bet
            )));
        }
        if !(self.max_bet.is_finite() && self.max_bet >= self.min_bet) {
            return Err(EngineError::invalid_config(format!(
                "max_bet must be finite and >= min_bet, got {}",
                self.max_bet
            )));
        }
        if !(self.bankroll.is_finite() && self.bankroll >= 0.0) {
            return Err(EngineError::invalid_input(format!(
                "bankroll must be non-negative, got {}",
                self.bankroll
            )));
        }
        Ok(())
    }
}

/// The constraint that determined a stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingConstraint {
    /// No edge at the undisturbed quote; nothing to bet.
    NoEdge,
    /// The self-consistent Kelly fixed point.
    Kelly,
    /// The probability-impact ceiling, not Kelly, set the size.
    ImpactCeiling,
    /// Clamped to `max_bet`.
    MaxBet,
    /// Clamped to the bankroll.
    Bankroll,
    /// The constrained stake fell under `min_bet`.
    BelowMinimum,
}

/// Intermediate values of one sizing call, for logging and inspection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizingDiagnostics {
    /// Kelly fraction at the undisturbed quote, κ(p).
    pub naive_kelly_fraction: f64,
    /// κ(p)·f·B, the stake a bettor ignoring impact would place.
    pub naive_stake: f64,
    /// Fixed point of M = κ(m(M))·f·B.
    pub kelly_stake: f64,
    /// Stake whose impact equals the ceiling, when the ceiling was hit.
    pub impact_capped_stake: Option<f64>,
    /// Bisection iterations spent on the fixed point.
    pub iterations: u32,
    /// Whether the fixed point met its tolerance within the budget.
    pub converged: bool,
    /// Marginal probability of the returned stake (YES terms).
    pub marginal_probability: f64,
    /// Signed probability impact of the returned stake.
    pub price_impact: f64,
    /// Constraint that produced the returned stake.
    pub binding: BindingConstraint,
}

impl SizingDiagnostics {
    pub(crate) const fn no_edge(quoted: f64, naive_kelly_fraction: f64) -> Self {
        Self {
            naive_kelly_fraction,
            naive_stake: 0.0,
            kelly_stake: 0.0,
            impact_capped_stake: None,
            iterations: 0,
            converged: true,
            marginal_probability: quoted,
            price_impact: 0.0,
            binding: BindingConstraint::NoEdge,
        }
    }
}

/// Output of the sizing engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizingResult {
    /// Stake to place, 0 when skipping.
    pub amount: f64,
    /// YES/NO, or SKIP when `amount` is 0.
    pub direction: Direction,
    pub diagnostics: SizingDiagnostics,
}

impl SizingResult {
    pub(crate) const fn skip(diagnostics: SizingDiagnostics) -> Self {
        Self {
            amount: 0.0,
            direction: Direction::Skip,
            diagnostics,
        }
    }
}

fn ensure_open_unit(value: f64, what: &str) -> EngineResult<()> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(EngineError::invalid_input(format!(
            "{what} must be strictly inside (0, 1), got {value}"
        )))
    }
}
