//! Trading Session - One Pass Over the Configured Markets
//!
//! For every market ID the session:
//! 1. Fetches the current snapshot via `MarketSource`
//! 2. Elicits a belief via `BeliefSource`
//! 3. Runs the decision policy against the current bankroll
//! 4. Places the bet via `OrderSink` (unless dry-run or out of budget)
//!
//! A failing market is logged and counted; it never aborts the pass.
//! Orders are throttled by a token-bucket limiter.

use std::num::NonZeroU32;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::SessionConfig;
use crate::domain::policy::{Decision, DecisionPolicy};
use crate::domain::trade::{MarketId, SizingParameters};
use crate::ports::belief::BeliefSource;
use crate::ports::execution::{BetOrder, OrderSink};
use crate::ports::market_source::MarketSource;

/// What happened to one market during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketStatus {
  /// Bet accepted by the sink.
  Bet,
  /// Bet decided but not submitted (dry-run).
  DryRun,
  /// The policy decided to skip.
  Skipped,
  /// Market already resolved.
  Resolved,
  /// Bet decided but the session bet budget was spent.
  BudgetExhausted,
  /// Sink refused the bet.
  Rejected,
  /// Fetching, estimating, deciding or placing failed.
  Error,
}

/// Per-market record in the session summary.
#[derive(Debug, Clone, Serialize)]
pub struct MarketOutcome {
  pub market_id: MarketId,
  pub status: MarketStatus,
  pub decision: Option<Decision>,
  pub rationale: Option<String>,
  /// Sink-assigned bet ID for accepted bets.
  pub bet_id: Option<String>,
  pub error: Option<String>,
}

impl MarketOutcome {
  fn new(market_id: &MarketId, status: MarketStatus) -> Self {
    Self {
      market_id: market_id.clone(),
      status,
      decision: None,
      rationale: None,
      bet_id: None,
      error: None,
    }
  }
}

/// Result of one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
  /// Markets for which a decision was computed.
  pub markets_analyzed: usize,
  pub bets_placed: usize,
  pub skipped: usize,
  pub errors: usize,
  /// Sum of accepted stakes.
  pub total_staked: Decimal,
  pub initial_balance: f64,
  pub final_balance: f64,
  pub outcomes: Vec<MarketOutcome>,
}

impl SessionSummary {
  /// Number of outcomes with the given status.
  pub fn count(&self, status: MarketStatus) -> usize {
    self.outcomes.iter().filter(|o| o.status == status).count()
  }
}

/// Session runner wiring the three ports to the decision policy.
pub struct SessionRunner<M: MarketSource, B: BeliefSource, O: OrderSink> {
  /// Market pricing state.
  markets: Arc<M>,
  /// Belief provider.
  beliefs: Arc<B>,
  /// Bet placement.
  orders: Arc<O>,
  /// Gates and sizing strategy.
  policy: DecisionPolicy,
  /// Sizing limits; the bankroll is replaced per market.
  sizing: SizingParameters,
  /// Session limits.
  config: SessionConfig,
  /// Decide without submitting.
  dry_run: bool,
  /// Order throttle.
  limiter: DefaultDirectRateLimiter,
}

impl<M: MarketSource, B: BeliefSource, O: OrderSink> SessionRunner<M, B, O> {
  /// Create a new session runner.
  ///
  /// # Errors
  /// Fails if `orders_per_minute` is zero.
  pub fn new(
    markets: Arc<M>,
    beliefs: Arc<B>,
    orders: Arc<O>,
    policy: DecisionPolicy,
    sizing: SizingParameters,
    config: SessionConfig,
    dry_run: bool,
  ) -> Result<Self> {
    let per_minute = NonZeroU32::new(config.orders_per_minute)
      .context("orders_per_minute must be positive")?;
    let limiter = RateLimiter::direct(Quota::per_minute(per_minute));

    Ok(Self {
      markets,
      beliefs,
      orders,
      policy,
      sizing,
      config,
      dry_run,
      limiter,
    })
  }

  /// Evaluate every market once, in order.
  ///
  /// # Errors
  /// Fails if the market source or the order sink reports unhealthy, or
  /// if the starting balance cannot be read; per-market failures are
  /// recorded in the summary instead.
  #[instrument(skip(self, market_ids), fields(markets = market_ids.len(), beliefs = self.beliefs.name()))]
  pub async fn run(&self, market_ids: &[MarketId]) -> Result<SessionSummary> {
    anyhow::ensure!(self.markets.is_healthy().await, "Market source is unhealthy");
    anyhow::ensure!(self.orders.is_healthy().await, "Order sink is unhealthy");

    let started_at = Utc::now();
    let initial_balance = self
      .orders
      .available_balance()
      .await
      .context("Failed to read starting balance")?;

    info!(
      balance = initial_balance,
      max_bets = self.config.max_bets,
      dry_run = self.dry_run,
      "Starting session"
    );

    let mut bankroll = initial_balance;
    let mut summary = SessionSummary {
      started_at,
      finished_at: started_at,
      markets_analyzed: 0,
      bets_placed: 0,
      skipped: 0,
      errors: 0,
      total_staked: Decimal::ZERO,
      initial_balance,
      final_balance: initial_balance,
      outcomes: Vec::with_capacity(market_ids.len()),
    };

    for market_id in market_ids {
      let budget_left = summary.bets_placed < self.config.max_bets;
      let outcome = match self.evaluate(market_id, bankroll, budget_left).await {
        Ok((outcome, staked)) => {
          if let Some(amount) = staked {
            summary.total_staked += amount;
            bankroll = (bankroll - amount.to_f64().unwrap_or(0.0)).max(0.0);
          }
          outcome
        }
        Err(e) => {
          warn!(market = %market_id, error = %format!("{e:#}"), "Market evaluation failed");
          let mut outcome = MarketOutcome::new(market_id, MarketStatus::Error);
          outcome.error = Some(format!("{e:#}"));
          outcome
        }
      };

      match outcome.status {
        MarketStatus::Bet => summary.bets_placed += 1,
        MarketStatus::Skipped => summary.skipped += 1,
        MarketStatus::Error => summary.errors += 1,
        _ => {}
      }
      if outcome.decision.is_some() {
        summary.markets_analyzed += 1;
      }
      summary.outcomes.push(outcome);
    }

    summary.final_balance = match self.orders.available_balance().await {
      Ok(balance) => balance,
      Err(e) => {
        warn!(error = %e, "Failed to read final balance, using tracked bankroll");
        bankroll
      }
    };
    summary.finished_at = Utc::now();

    info!(
      analyzed = summary.markets_analyzed,
      bets = summary.bets_placed,
      skipped = summary.skipped,
      errors = summary.errors,
      staked = %summary.total_staked,
      final_balance = summary.final_balance,
      "Session finished"
    );

    Ok(summary)
  }

  /// Evaluate one market. Returns the outcome and the accepted stake.
  #[instrument(skip(self, market_id), fields(market = %market_id))]
  async fn evaluate(
    &self,
    market_id: &MarketId,
    bankroll: f64,
    budget_left: bool,
  ) -> Result<(MarketOutcome, Option<Decimal>)> {
    let snapshot = self.markets.snapshot(market_id).await?;
    if snapshot.resolved {
      debug!("Market resolved, skipping");
      return Ok((MarketOutcome::new(market_id, MarketStatus::Resolved), None));
    }

    let quote = snapshot.quote()?;
    let elicited = self.beliefs.estimate(&snapshot).await?;
    let params = self.sizing.with_bankroll(bankroll);
    let decision = self.policy.decide(&elicited.belief, &quote, &params)?;

    info!(
      p = quote.probability(),
      q = elicited.belief.true_probability,
      confidence = elicited.belief.confidence,
      direction = %decision.direction,
      amount = decision.amount,
      rationale = %elicited.rationale,
      "Decision made"
    );

    let mut outcome = MarketOutcome::new(market_id, MarketStatus::Skipped);
    outcome.decision = Some(decision);
    outcome.rationale = Some(elicited.rationale);

    let Some(side) = decision.direction.outcome() else {
      return Ok((outcome, None));
    };
    if !budget_left {
      debug!("Session bet budget spent");
      outcome.status = MarketStatus::BudgetExhausted;
      return Ok((outcome, None));
    }
    if self.dry_run {
      outcome.status = MarketStatus::DryRun;
      return Ok((outcome, None));
    }

    let order = BetOrder::new(market_id.clone(), side, decision.amount)?;
    self.limiter.until_ready().await;
    let confirmation = self.orders.place_bet(&order).await?;

    if confirmation.accepted {
      outcome.status = MarketStatus::Bet;
      outcome.bet_id = Some(confirmation.bet_id);
      Ok((outcome, Some(order.amount)))
    } else {
      warn!(reason = ?confirmation.rejection_reason, "Bet rejected");
      outcome.status = MarketStatus::Rejected;
      outcome.error = confirmation.rejection_reason;
      Ok((outcome, None))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::beliefs::{FixedBelief, ThresholdRule};
  use crate::adapters::markets::StaticMarketSource;
  use crate::adapters::paper::PaperOrderSink;
  use crate::domain::trade::BeliefEstimate;
  use crate::ports::belief::ElicitedBelief;
  use crate::ports::market_source::MarketSnapshot;

  fn snapshot(id: &str, p: f64, resolved: bool) -> MarketSnapshot {
    MarketSnapshot {
      id: id.to_string(),
      question: String::new(),
      probability: p,
      liquidity: 100.0,
      resolved,
    }
  }

  fn belief(id: &str, q: f64) -> (MarketId, ElicitedBelief) {
    (
      id.to_string(),
      ElicitedBelief {
        belief: BeliefEstimate::new(q, 0.9).unwrap(),
        rationale: "test".to_string(),
      },
    )
  }

  fn runner(
    markets: Vec<MarketSnapshot>,
    beliefs: Vec<(MarketId, ElicitedBelief)>,
    config: SessionConfig,
    dry_run: bool,
  ) -> (
    SessionRunner<StaticMarketSource, FixedBelief, PaperOrderSink>,
    Arc<PaperOrderSink>,
  ) {
    let sink = Arc::new(PaperOrderSink::new(1000.0).unwrap());
    let runner = SessionRunner::new(
      Arc::new(StaticMarketSource::new(markets)),
      Arc::new(FixedBelief::new(beliefs)),
      Arc::clone(&sink),
      DecisionPolicy::default(),
      SizingParameters::default(),
      config,
      dry_run,
    )
    .unwrap();
    (runner, sink)
  }

  fn ids(ids: &[&str]) -> Vec<MarketId> {
    ids.iter().map(|s| (*s).to_string()).collect()
  }

  #[tokio::test]
  async fn test_places_bet_and_tracks_balance() {
    let (runner, sink) = runner(
      vec![snapshot("a", 0.5, false)],
      vec![belief("a", 0.7)],
      SessionConfig::default(),
      false,
    );
    let summary = runner.run(&ids(&["a"])).await.unwrap();

    assert_eq!(summary.bets_placed, 1);
    assert_eq!(summary.markets_analyzed, 1);
    assert_eq!(summary.errors, 0);
    assert_eq!(sink.placed_orders().await.len(), 1);
    assert!(summary.total_staked > Decimal::ZERO);
    let spent = summary.initial_balance - summary.final_balance;
    assert!((spent - summary.total_staked.to_f64().unwrap()).abs() < 1e-9);
  }

  #[tokio::test]
  async fn test_dry_run_places_nothing() {
    let (runner, sink) = runner(
      vec![snapshot("a", 0.5, false)],
      vec![belief("a", 0.7)],
      SessionConfig::default(),
      true,
    );
    let summary = runner.run(&ids(&["a"])).await.unwrap();

    assert_eq!(summary.bets_placed, 0);
    assert_eq!(summary.count(MarketStatus::DryRun), 1);
    assert!(sink.placed_orders().await.is_empty());
    assert_eq!(summary.total_staked, Decimal::ZERO);
  }

  #[tokio::test]
  async fn test_failures_are_counted_not_fatal() {
    let (runner, _sink) = runner(
      vec![snapshot("a", 0.5, false), snapshot("b", 0.5, false)],
      vec![belief("b", 0.7)],
      SessionConfig::default(),
      false,
    );
    // "a" has no belief, "ghost" is unknown to the source.
    let summary = runner.run(&ids(&["a", "ghost", "b"])).await.unwrap();

    assert_eq!(summary.errors, 2);
    assert_eq!(summary.bets_placed, 1);
    assert_eq!(summary.outcomes.len(), 3);
    assert!(summary.outcomes[0].error.is_some());
  }

  #[tokio::test]
  async fn test_resolved_and_budget() {
    let config = SessionConfig {
      max_bets: 1,
      orders_per_minute: 60,
    };
    let (runner, sink) = runner(
      vec![
        snapshot("done", 0.5, true),
        snapshot("a", 0.5, false),
        snapshot("b", 0.4, false),
      ],
      vec![belief("done", 0.9), belief("a", 0.7), belief("b", 0.6)],
      config,
      false,
    );
    let summary = runner.run(&ids(&["done", "a", "b"])).await.unwrap();

    assert_eq!(summary.count(MarketStatus::Resolved), 1);
    assert_eq!(summary.bets_placed, 1);
    assert_eq!(summary.count(MarketStatus::BudgetExhausted), 1);
    assert_eq!(sink.placed_orders().await.len(), 1);
  }

  #[tokio::test]
  async fn test_threshold_rule_session_skips_mid_band() {
    let sink = Arc::new(PaperOrderSink::new(500.0).unwrap());
    let runner = SessionRunner::new(
      Arc::new(StaticMarketSource::new([snapshot("mid", 0.5, false)])),
      Arc::new(ThresholdRule::default()),
      Arc::clone(&sink),
      DecisionPolicy::default(),
      SizingParameters::default(),
      SessionConfig::default(),
      false,
    )
    .unwrap();
    let summary = runner.run(&ids(&["mid"])).await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.bets_placed, 0);
  }

  #[test]
  fn test_zero_throttle_rejected() {
    let result = SessionRunner::new(
      Arc::new(StaticMarketSource::new(Vec::new())),
      Arc::new(ThresholdRule::default()),
      Arc::new(PaperOrderSink::new(10.0).unwrap()),
      DecisionPolicy::default(),
      SizingParameters::default(),
      SessionConfig {
        max_bets: 1,
        orders_per_minute: 0,
      },
      false,
    );
    assert!(result.is_err());
  }
}
