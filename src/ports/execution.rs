//! Order Execution Port - Bet Placement Interface
//!
//! Defines the trait for submitting sized bets and reading the
//! balance they are sized against.
//!
//! Key design decisions:
//! - Amounts cross this boundary as `Decimal` rounded to cents
//! - Every order carries a client-generated UUID for idempotency

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::trade::{MarketId, Outcome};

/// A bet ready to be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetOrder {
  /// Client-side identifier.
  pub client_id: Uuid,
  /// Target market.
  pub market_id: MarketId,
  /// Outcome to buy.
  pub outcome: Outcome,
  /// Amount to spend, rounded to cents.
  pub amount: Decimal,
  /// Creation time.
  pub created_at: DateTime<Utc>,
}

impl BetOrder {
  /// Build an order from an engine stake.
  ///
  /// # Errors
  /// Fails if the stake is not representable or rounds to zero.
  pub fn new(market_id: MarketId, outcome: Outcome, amount: f64) -> anyhow::Result<Self> {
    let amount = Decimal::from_f64(amount)
      .with_context(|| format!("Stake {amount} is not representable as a decimal"))?
      .round_dp(2);
    anyhow::ensure!(
      amount > Decimal::ZERO,
      "Stake for market {market_id} rounds to zero"
    );

    Ok(Self {
      client_id: Uuid::new_v4(),
      market_id,
      outcome,
      amount,
      created_at: Utc::now(),
    })
  }
}

/// Result of a placement attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetConfirmation {
  /// Echo of the order's client ID.
  pub client_id: Uuid,
  /// Venue-assigned bet ID.
  pub bet_id: String,
  /// Whether the bet was accepted.
  pub accepted: bool,
  /// Rejection reason if not accepted.
  pub rejection_reason: Option<String>,
}

/// Trait for order placement sinks.
#[async_trait]
pub trait OrderSink: Send + Sync + 'static {
  /// Submit a single bet.
  ///
  /// # Errors
  /// Returns error on transport failure; venue rejections come back
  /// as `accepted: false`.
  async fn place_bet(&self, order: &BetOrder) -> anyhow::Result<BetConfirmation>;

  /// Balance available for new bets.
  async fn available_balance(&self) -> anyhow::Result<f64>;

  /// Check if the sink is reachable.
  async fn is_healthy(&self) -> bool;
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  #[test]
  fn test_order_rounds_to_cents() {
    let order = BetOrder::new("m1".to_string(), Outcome::Yes, 10.536_051).unwrap();
    assert_eq!(order.amount, dec!(10.54));
    assert_eq!(order.outcome, Outcome::Yes);
  }

  #[test]
  fn test_order_rejects_dust() {
    assert!(BetOrder::new("m1".to_string(), Outcome::No, 0.001).is_err());
    assert!(BetOrder::new("m1".to_string(), Outcome::No, f64::NAN).is_err());
  }
}
