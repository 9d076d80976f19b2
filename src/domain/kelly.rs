//! Kelly Criterion position sizing under self-impact.
//!
//! The naive Kelly stake at the quoted probability `p` for a belief `q` is
//! `κ(p)·f·B` with `κ(x) = (q − x) / (x·(1 − x))`. It overbets: the stake
//! itself moves an LMSR market, so the bettor actually pays the marginal
//! probability `m(M)`, which rises with `M` against them. We size at the
//! fixed point
//!
//! ```text
//! M = κ(m(M))·f·B
//! ```
//!
//! The right side is non-increasing in `M`, so the fixed point in `[0, B]`
//! is unique and found by bisection. A second bisection then enforces the
//! probability-impact ceiling, and the result is clamped to the bet limits.
//!
//! κ is always evaluated in the traded side's own probability space, so a
//! NO bet on a YES quote of `p` sizes exactly like a YES bet at `1 − p`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{EngineError, EngineResult};
use super::lmsr::{LmsrModel, PricingConfig};
use super::trade::{
    BeliefEstimate, BindingConstraint, Direction, MarketQuote, Outcome, SizingDiagnostics,
    SizingParameters, SizingResult, Trade,
};

/// Search knobs for the two sizing bisections.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingTolerances {
    /// Absolute currency tolerance on `|M − κ(m(M))·f·B|`.
    pub fixed_point_tolerance: f64,
    /// Iteration cap of the fixed-point search.
    pub max_fixed_point_iterations: u32,
    /// Probability-unit tolerance of the impact-ceiling search.
    pub impact_tolerance: f64,
    /// Iteration cap of the impact-ceiling search.
    pub max_impact_iterations: u32,
}

impl Default for SizingTolerances {
    fn default() -> Self {
        Self {
            fixed_point_tolerance: 0.01,
            max_fixed_point_iterations: 40,
            impact_tolerance: 1e-9,
            max_impact_iterations: 100,
        }
    }
}

impl SizingTolerances {
    /// # Errors
    /// `InvalidConfiguration` for non-positive tolerances or zero budgets.
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.fixed_point_tolerance.is_finite() && self.fixed_point_tolerance > 0.0)
            || !(self.impact_tolerance.is_finite() && self.impact_tolerance > 0.0)
        {
            return Err(EngineError::invalid_config(
                "sizing tolerances must be positive",
            ));
        }
        if self.max_fixed_point_iterations == 0 || self.max_impact_iterations == 0 {
            return Err(EngineError::invalid_config(
                "sizing iteration caps must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Kelly fraction for buying `outcome` at YES-probability `price` when the
/// YES probability is believed to be `belief`.
///
/// Positive means the trade has an edge at that price.
pub fn kelly_fraction_at(belief: f64, price: f64, outcome: Outcome) -> f64 {
    let q = outcome.side_probability(belief);
    let x = outcome.side_probability(price);
    (q - x) / (x * (1.0 - x))
}

/// Impact-aware fractional Kelly sizer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KellySizer {
    pricing: PricingConfig,
    tolerances: SizingTolerances,
}

/// Where the fixed-point search stopped.
#[derive(Debug, Clone, Copy)]
struct FixedPoint {
    stake: f64,
    iterations: u32,
    converged: bool,
}

impl KellySizer {
    pub const fn new(pricing: PricingConfig, tolerances: SizingTolerances) -> Self {
        Self {
            pricing,
            tolerances,
        }
    }

    pub const fn tolerances(&self) -> &SizingTolerances {
        &self.tolerances
    }

    pub const fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    /// Computes the stake for `belief` against `quote`.
    ///
    /// Returns a SKIP result (amount 0) when there is no edge at the
    /// undisturbed quote or the constrained stake is below `min_bet`.
    ///
    /// # Errors
    /// `InvalidInput`/`InvalidConfiguration` for bad inputs, and
    /// `DegenerateMarket` when the quote cannot be priced.
    pub fn size_bet(
        &self,
        belief: &BeliefEstimate,
        quote: &MarketQuote,
        params: &SizingParameters,
    ) -> EngineResult<SizingResult> {
        belief.validate()?;
        quote.validate()?;
        params.validate()?;
        self.tolerances.validate()?;
        let model = LmsrModel::for_quote(quote, self.pricing)?;

        let p = quote.probability();
        let q = belief.true_probability;
        let outcome = if q > p { Outcome::Yes } else { Outcome::No };
        let naive_kelly_fraction = kelly_fraction_at(q, p, outcome);
        if naive_kelly_fraction <= 0.0 {
            return Ok(SizingResult::skip(SizingDiagnostics::no_edge(p, 0.0)));
        }

        let scale = params.kelly_fraction * params.bankroll;
        let fixed = self.solve_fixed_point(&model, p, q, outcome, scale, params.bankroll)?;

        let kelly_impact = model.price_unchecked(p, &Trade::new(fixed.stake, outcome))?.price_impact;
        let cap = params.max_probability_impact;
        let impact_capped_stake = if kelly_impact.abs() > cap {
            Some(self.solve_impact_ceiling(&model, p, outcome, cap, fixed.stake, kelly_impact.abs())?)
        } else {
            None
        };

        let (mut amount, mut binding) = match impact_capped_stake {
            Some(capped) if capped < fixed.stake => (capped, BindingConstraint::ImpactCeiling),
            _ if fixed.stake >= params.bankroll - self.tolerances.fixed_point_tolerance => {
                (fixed.stake, BindingConstraint::Bankroll)
            }
            _ => (fixed.stake, BindingConstraint::Kelly),
        };
        if amount > params.max_bet {
            amount = params.max_bet;
            binding = BindingConstraint::MaxBet;
        }
        if amount > params.bankroll {
            amount = params.bankroll;
            binding = BindingConstraint::Bankroll;
        }

        let mut diagnostics = SizingDiagnostics {
            naive_kelly_fraction,
            naive_stake: naive_kelly_fraction * scale,
            kelly_stake: fixed.stake,
            impact_capped_stake,
            iterations: fixed.iterations,
            converged: fixed.converged,
            marginal_probability: p,
            price_impact: 0.0,
            binding,
        };

        if amount <= 0.0 || amount < params.min_bet {
            diagnostics.binding = BindingConstraint::BelowMinimum;
            debug!(
                stake = amount,
                min_bet = params.min_bet,
                "Constrained stake below minimum bet"
            );
            return Ok(SizingResult::skip(diagnostics));
        }

        let final_impact = model.price_unchecked(p, &Trade::new(amount, outcome))?;
        diagnostics.marginal_probability = final_impact.marginal_probability;
        diagnostics.price_impact = final_impact.price_impact;

        debug!(
            %outcome,
            amount,
            kelly_stake = fixed.stake,
            naive_stake = diagnostics.naive_stake,
            iterations = fixed.iterations,
            binding = ?binding,
            "Sized bet"
        );

        Ok(SizingResult {
            amount,
            direction: Direction::from(outcome),
            diagnostics,
        })
    }

    /// Bisection on `M ∈ [0, bankroll]` for `M = κ(m(M))·scale`.
    ///
    /// Exhausting the budget returns the last midpoint as best effort.
    fn solve_fixed_point(
        &self,
        model: &LmsrModel,
        p: f64,
        q: f64,
        outcome: Outcome,
        scale: f64,
        bankroll: f64,
    ) -> EngineResult<FixedPoint> {
        let tolerance = self.tolerances.fixed_point_tolerance;
        let max_iterations = self.tolerances.max_fixed_point_iterations;
        let mut lo = 0.0_f64;
        let mut hi = bankroll;
        let mut mid = 0.0_f64;

        for iteration in 1..=max_iterations {
            mid = lo + (hi - lo) / 2.0;
            let marginal = model.price_unchecked(p, &Trade::new(mid, outcome))?.marginal_probability;
            let kappa = kelly_fraction_at(q, marginal, outcome);

            // Impact has erased the edge at this size.
            if kappa <= 0.0 {
                hi = mid;
                continue;
            }

            let desired = kappa * scale;
            if (mid - desired).abs() < tolerance {
                return Ok(FixedPoint {
                    stake: mid,
                    iterations: iteration,
                    converged: true,
                });
            }
            if mid < desired {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        Ok(FixedPoint {
            stake: mid,
            iterations: max_iterations,
            converged: false,
        })
    }

    /// Largest stake below `upper` whose absolute impact stays within `cap`.
    ///
    /// `|impact(M)|` is increasing in `M`; the lower bracket end is returned
    /// so the ceiling is never exceeded.
    fn solve_impact_ceiling(
        &self,
        model: &LmsrModel,
        p: f64,
        outcome: Outcome,
        cap: f64,
        upper: f64,
        upper_impact: f64,
    ) -> EngineResult<f64> {
        let mut lo = 0.0_f64;
        let mut hi = upper;
        let mut impact_lo = 0.0_f64;
        let mut impact_hi = upper_impact;

        for _ in 0..self.tolerances.max_impact_iterations {
            if impact_hi - impact_lo < self.tolerances.impact_tolerance {
                break;
            }
            let mid = lo + (hi - lo) / 2.0;
            if mid <= lo || mid >= hi {
                break;
            }
            let impact = model.price_unchecked(p, &Trade::new(mid, outcome))?.price_impact.abs();
            if impact <= cap {
                lo = mid;
                impact_lo = impact;
            } else {
                hi = mid;
                impact_hi = impact;
            }
        }

        Ok(lo)
    }
}

/// Sizes a bet with the default pricing and search configuration.
///
/// # Errors
/// See [`KellySizer::size_bet`].
pub fn size_bet(
    belief: &BeliefEstimate,
    quote: &MarketQuote,
    params: &SizingParameters,
) -> EngineResult<SizingResult> {
    KellySizer::default().size_bet(belief, quote, params)
}
