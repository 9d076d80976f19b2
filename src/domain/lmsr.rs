//! Logarithmic Market Scoring Rule (LMSR) pricing for binary markets.
//!
//! Reference: Hanson (2003) "Combinatorial Information Market Design".
//!
//! The market is described by its quoted probability `p` and liquidity
//! parameter `b`. Only the relative share position matters to the cost
//! function, so the model works with the implied position
//! `r = b·ln(p / (1 − p))` instead of absolute share counts:
//!
//! ```text
//! cost(δ) = b·ln(e^{(r+δ)/b} + 1) − b·ln(e^{r/b} + 1)
//! p′      = e^{(r+δ)/b} / (e^{(r+δ)/b} + 1)
//! ```
//!
//! NO trades are priced by mirroring the market (`p → 1 − p`).
//! Inverting the cost for a given spend is done by bisection: the
//! exponentials lose precision near the asymptotes and bisection keeps
//! converging there where a Newton step would not.

use serde::{Deserialize, Serialize};

use super::error::{EngineError, EngineResult};
use super::trade::{MarketQuote, Outcome, Trade, TradeImpact};

/// Solver knobs for inverting the cost function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Relative tolerance on the post-trade and marginal probability
    /// brackets, measured against their distance from the quote.
    pub tolerance: f64,
    /// Bisection budget before the market is declared degenerate.
    pub max_iterations: u32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-9,
            max_iterations: 200,
        }
    }
}

impl PricingConfig {
    /// # Errors
    /// `InvalidConfiguration` for a non-positive tolerance or a zero budget.
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(EngineError::invalid_config(format!(
                "pricing tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(EngineError::invalid_config(
                "pricing max_iterations must be at least 1",
            ));
        }
        Ok(())
    }
}

/// LMSR pricing model for a binary market with liquidity `b`.
///
/// - Higher `b` = deeper market, slower price movement per unit traded
/// - Lower `b` = thinner market, every stake moves the quote further
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmsrModel {
    b: f64,
    config: PricingConfig,
}

impl LmsrModel {
    /// Creates a model with the default solver configuration.
    ///
    /// # Errors
    /// `InvalidConfiguration` if `b` is not a positive finite number.
    pub fn new(b: f64) -> EngineResult<Self> {
        Self::with_config(b, PricingConfig::default())
    }

    /// # Errors
    /// `InvalidConfiguration` for a bad `b` or solver configuration.
    pub fn with_config(b: f64, config: PricingConfig) -> EngineResult<Self> {
        if !(b.is_finite() && b > 0.0) {
            return Err(EngineError::invalid_config(format!(
                "LMSR liquidity parameter b must be positive, got {b}"
            )));
        }
        config.validate()?;
        Ok(Self { b, config })
    }

    /// Model keyed by the quote's own liquidity parameter.
    ///
    /// # Errors
    /// Same as [`LmsrModel::with_config`].
    pub fn for_quote(quote: &MarketQuote, config: PricingConfig) -> EngineResult<Self> {
        Self::with_config(quote.liquidity(), config)
    }

    /// Returns the liquidity parameter.
    pub const fn liquidity(&self) -> f64 {
        self.b
    }

    /// Implied relative share position r = b·ln(p / (1 − p)).
    pub fn implied_position(&self, probability: f64) -> f64 {
        self.b * logit(probability)
    }

    /// Instantaneous YES price at relative position `r`.
    pub fn price_at(&self, position: f64) -> f64 {
        sigmoid(position / self.b)
    }

    /// Cost of buying `shares` of `outcome` in a market quoted at
    /// `probability`.
    pub fn cost_to_buy(&self, probability: f64, outcome: Outcome, shares: f64) -> f64 {
        let side = outcome.side_probability(probability);
        self.side_cost(side, shares)
    }

    /// Prices a trade: shares acquired, post-trade quote, marginal
    /// probability and signed impact.
    ///
    /// # Errors
    /// - `InvalidInput` for a negative/non-finite amount or a probability
    ///   outside (0, 1)
    /// - `DegenerateMarket` if the solver cannot resolve the trade or the
    ///   post-trade quote collapses onto 0 or 1
    pub fn price_trade(&self, probability: f64, trade: &Trade) -> EngineResult<TradeImpact> {
        let impact = self.price_unchecked(probability, trade)?;
        let post = impact.post_trade_probability;
        if !(post > 0.0 && post < 1.0) {
            return Err(EngineError::DegenerateMarket {
                probability,
                iterations: 0,
                reason: format!(
                    "post-trade probability saturated at {post} for {} {}",
                    trade.amount, trade.outcome
                ),
            });
        }
        Ok(impact)
    }

    /// Average YES-equivalent probability paid for `amount` of `outcome`.
    ///
    /// # Errors
    /// See [`LmsrModel::price_trade`].
    pub fn marginal_probability(
        &self,
        probability: f64,
        amount: f64,
        outcome: Outcome,
    ) -> EngineResult<f64> {
        self.price_trade(probability, &Trade::new(amount, outcome))
            .map(|impact| impact.marginal_probability)
    }

    /// Signed move of the YES probability caused by `amount` of `outcome`.
    ///
    /// # Errors
    /// See [`LmsrModel::price_trade`].
    pub fn price_impact(
        &self,
        probability: f64,
        amount: f64,
        outcome: Outcome,
    ) -> EngineResult<f64> {
        self.price_trade(probability, &Trade::new(amount, outcome))
            .map(|impact| impact.price_impact)
    }

    /// Prices a trade without rejecting a saturated post-trade quote.
    ///
    /// The sizing searches try amounts far beyond anything they will
    /// return; shares and marginal probability stay well defined there
    /// even once `p′` rounds to 1.
    pub(crate) fn price_unchecked(
        &self,
        probability: f64,
        trade: &Trade,
    ) -> EngineResult<TradeImpact> {
        let amount = trade.amount;
        if !(amount.is_finite() && amount >= 0.0) {
            return Err(EngineError::invalid_input(format!(
                "trade amount must be a non-negative number, got {amount}"
            )));
        }
        if !(probability > 0.0 && probability < 1.0) {
            return Err(EngineError::invalid_input(format!(
                "market probability must be strictly inside (0, 1), got {probability}"
            )));
        }
        if amount == 0.0 {
            return Ok(TradeImpact {
                shares: 0.0,
                post_trade_probability: probability,
                marginal_probability: probability,
                price_impact: 0.0,
            });
        }

        let outcome = trade.outcome;
        let side = outcome.side_probability(probability);
        let shares = self.solve_shares(probability, side, amount)?;

        // Signed YES-space move, taken from the side-space gap directly so
        // small trades in deep markets keep their precision.
        let moved = side_shift(side, shares / self.b);
        let price_impact = match outcome {
            Outcome::Yes => moved,
            Outcome::No => -moved,
        };
        let marginal = outcome.side_probability(amount / shares);

        Ok(TradeImpact {
            shares,
            post_trade_probability: probability + price_impact,
            marginal_probability: marginal,
            price_impact,
        })
    }

    /// Finds δ with cost(δ) = amount for a side quoted at `side`.
    ///
    /// The price of a share never leaves (side, 1), so the root lies in
    /// [amount, amount / side]. The bracket is narrowed until the post-trade
    /// and marginal probabilities are pinned relative to their distance from
    /// the quote, or until it cannot be split any further.
    fn solve_shares(&self, probability: f64, side: f64, amount: f64) -> EngineResult<f64> {
        let mut lo = amount;
        let mut hi = amount / side;
        if !hi.is_finite() {
            return Err(EngineError::DegenerateMarket {
                probability,
                iterations: 0,
                reason: format!("share bracket overflowed for amount {amount}"),
            });
        }

        let tolerance = self.config.tolerance;
        for _ in 0..self.config.max_iterations {
            let mid = lo + (hi - lo) / 2.0;
            // Bracket is down to adjacent floats.
            if mid <= lo || mid >= hi {
                return Ok(mid);
            }
            if self.side_cost(side, mid) < amount {
                lo = mid;
            } else {
                hi = mid;
            }

            let shift_lo = side_shift(side, lo / self.b);
            let shift_hi = side_shift(side, hi / self.b);
            let post_pinned = shift_hi - shift_lo <= tolerance * shift_lo;
            let marginal_gap = amount / hi - side;
            let marginal_pinned =
                marginal_gap > 0.0 && amount / lo - amount / hi <= tolerance * marginal_gap;
            if post_pinned && marginal_pinned {
                return Ok(lo + (hi - lo) / 2.0);
            }
        }

        Err(EngineError::DegenerateMarket {
            probability,
            iterations: self.config.max_iterations,
            reason: format!("share solver did not converge for amount {amount}"),
        })
    }

    /// cost(δ) for a side quoted at `side`: `b·ln(1 + side·(e^{δ/b} − 1))`.
    fn side_cost(&self, side: f64, shares: f64) -> f64 {
        let d = shares / self.b;
        if d < EXP_LIMIT {
            self.b * (side * d.exp_m1()).ln_1p()
        } else {
            // e^d overflows: ln(side·e^d + 1 − side) = d + ln(side) + ln(1 + e^{ln((1−side)/side) − d})
            self.b * (d + side.ln() + softplus((-side).ln_1p() - side.ln() - d))
        }
    }
}

/// Largest exponent handled through `exp_m1` without overflow.
const EXP_LIMIT: f64 = 700.0;

/// Move of a side's probability from `side` after buying `d·b` shares:
/// `side·(1 − side)·(e^d − 1) / (1 + side·(e^d − 1))`.
fn side_shift(side: f64, d: f64) -> f64 {
    if d < EXP_LIMIT {
        let grown = d.exp_m1();
        side * (1.0 - side) * grown / side.mul_add(grown, 1.0)
    } else {
        sigmoid(logit(side) + d) - side
    }
}

/// Prices `trade` against `quote` with the default solver configuration.
///
/// # Errors
/// See [`LmsrModel::price_trade`]; a non-positive liquidity is
/// `InvalidConfiguration`.
pub fn price_trade(quote: &MarketQuote, trade: &Trade) -> EngineResult<TradeImpact> {
    LmsrModel::for_quote(quote, PricingConfig::default())?.price_trade(quote.probability(), trade)
}

fn logit(p: f64) -> f64 {
    p.ln() - (-p).ln_1p()
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// ln(1 + e^x) without overflow.
fn softplus(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(b: f64) -> LmsrModel {
        LmsrModel::new(b).unwrap()
    }

    /// Closed-form inverse of the cost, used to check the solver.
    fn exact_shares(p: f64, b: f64, amount: f64) -> f64 {
        b * (((amount / b).exp() - 1.0 + p) / p).ln()
    }

    #[test]
    fn test_implied_position_round_trips_price() {
        let m = model(100.0);
        for p in [0.03, 0.25, 0.5, 0.8, 0.97] {
            let r = m.implied_position(p);
            assert!((m.price_at(r) - p).abs() < 1e-12, "p={p}");
        }
        assert!(m.implied_position(0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_amount_has_no_impact() {
        let impact = model(100.0).price_trade(0.42, &Trade::yes(0.0)).unwrap();
        assert_eq!(impact.shares, 0.0);
        assert_eq!(impact.price_impact, 0.0);
        assert_eq!(impact.marginal_probability, 0.42);
        assert_eq!(impact.post_trade_probability, 0.42);
    }

    #[test]
    fn test_solver_matches_closed_form() {
        let m = model(100.0);
        for (p, amount) in [(0.5, 10.0), (0.2, 35.0), (0.9, 250.0), (0.05, 1.0)] {
            let impact = m.price_trade(p, &Trade::yes(amount)).unwrap();
            let exact = exact_shares(p, 100.0, amount);
            assert!(
                (impact.shares - exact).abs() / exact < 1e-7,
                "p={p} amount={amount}: got {}, want {exact}",
                impact.shares
            );
            let cost = m.cost_to_buy(p, Outcome::Yes, impact.shares);
            assert!((cost - amount).abs() < 1e-6);
        }
    }

    #[test]
    fn test_yes_trade_moves_price_up() {
        let impact = model(100.0).price_trade(0.5, &Trade::yes(10.0)).unwrap();
        assert!(impact.price_impact > 0.0);
        assert!(impact.marginal_probability > 0.5);
        assert!(impact.marginal_probability < impact.post_trade_probability);
    }

    #[test]
    fn test_no_trade_mirrors_yes_trade() {
        let m = model(100.0);
        let yes = m.price_trade(0.3, &Trade::yes(20.0)).unwrap();
        let no = m.price_trade(0.7, &Trade::no(20.0)).unwrap();
        assert!((yes.shares - no.shares).abs() < 1e-6);
        assert!((yes.price_impact + no.price_impact).abs() < 1e-9);
        assert!((yes.marginal_probability - (1.0 - no.marginal_probability)).abs() < 1e-9);
        assert!(no.marginal_probability < 0.7);
        assert!(no.marginal_probability > no.post_trade_probability);
    }

    #[test]
    fn test_ten_dollars_at_half_in_hundred_b_market() {
        // δ = 100·ln(2e^{0.1} − 1) ≈ 20.07, p′ ≈ 0.55
        let impact = model(100.0).price_trade(0.5, &Trade::yes(10.536_051_565_782_63)).unwrap();
        assert!((impact.post_trade_probability - 0.55).abs() < 1e-6);
        assert!((impact.shares - 20.067_069_546_215_12).abs() < 1e-5);
    }

    #[test]
    fn test_small_trade_in_deep_market_keeps_precision() {
        let cases = [
            (0.5, 1e10, Trade::yes(1.0)),
            (0.5, 1e9, Trade::yes(1.0)),
            (0.2, 1e12, Trade::no(10.0)),
            (0.9, 1e11, Trade::yes(0.5)),
            (0.1, 1e11, Trade::no(0.5)),
        ];
        for (p, b, trade) in cases {
            let impact = model(b).price_trade(p, &trade).unwrap();
            let post_gap = impact.post_trade_probability - p;
            let marginal_gap = impact.marginal_probability - p;
            assert!(post_gap != 0.0, "p={p} b={b}: no impact");
            // First order: m sits halfway between p and p′.
            let ratio = marginal_gap / post_gap;
            assert!(
                ratio > 0.49 && ratio < 0.51,
                "p={p} b={b}: m−p={marginal_gap:e}, p′−p={post_gap:e}"
            );
        }
    }

    #[test]
    fn test_deep_market_shares_match_closed_form() {
        // δ = b·ln(1 + (e^{M/b} − 1)/p), evaluated without cancellation.
        let (p, b, amount): (f64, f64, f64) = (0.5, 1e9, 1.0);
        let exact = b * ((amount / b).exp_m1() / p).ln_1p();
        let impact = model(b).price_trade(p, &Trade::yes(amount)).unwrap();
        assert!((impact.shares - exact).abs() / exact < 1e-12);
        assert!((impact.price_impact - 5e-10).abs() < 1e-15);
        assert!((impact.marginal_probability - p - 2.5e-10).abs() < 1e-15);
    }

    #[test]
    fn test_negative_amount_is_invalid_input() {
        let err = model(100.0).price_trade(0.5, &Trade::yes(-1.0)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { .. }));
    }

    #[test]
    fn test_non_positive_liquidity_is_invalid_configuration() {
        assert!(matches!(
            LmsrModel::new(0.0),
            Err(EngineError::InvalidConfiguration { .. })
        ));
        let quote = MarketQuote::new(0.5, 10.0).unwrap();
        assert!(price_trade(&quote, &Trade::no(5.0)).is_ok());
    }

    #[test]
    fn test_saturated_quote_is_degenerate() {
        // A large YES stake against a thin market pushes p′ onto 1.0.
        let err = model(1.0).price_trade(0.5, &Trade::yes(500.0)).unwrap_err();
        assert!(err.is_degenerate(), "got {err:?}");
    }

    #[test]
    fn test_pinned_quote_overflows_bracket() {
        let err = model(100.0).price_trade(1e-310, &Trade::yes(1e10)).unwrap_err();
        assert!(err.is_degenerate(), "got {err:?}");
    }

    #[test]
    fn test_unchecked_pricing_survives_saturation() {
        let impact = model(1.0).price_unchecked(0.5, &Trade::yes(500.0)).unwrap();
        assert!(impact.marginal_probability < 1.0);
        assert!(impact.marginal_probability > 0.99);
    }

    #[test]
    fn test_tiny_iteration_budget_is_degenerate() {
        let config = PricingConfig {
            tolerance: 1e-12,
            max_iterations: 2,
        };
        let m = LmsrModel::with_config(100.0, config).unwrap();
        let err = m.price_trade(0.5, &Trade::yes(40.0)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::DegenerateMarket { iterations: 2, .. }
        ));
    }

    #[test]
    fn test_softplus_is_stable() {
        assert!((softplus(800.0) - 800.0).abs() < 1e-9);
        assert!(softplus(-800.0) >= 0.0);
        assert!((softplus(0.0) - std::f64::consts::LN_2).abs() < 1e-15);
    }
}
