//! Paper Order Sink - Dry-run Bet Execution
//!
//! Implements the `OrderSink` port against an in-memory balance.
//! Bets are accepted while the paper balance covers them and recorded
//! for later inspection; nothing leaves the process.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::ports::execution::{BetConfirmation, BetOrder, OrderSink};

/// Order sink that debits a paper balance.
pub struct PaperOrderSink {
    /// Remaining paper balance.
    balance: Mutex<Decimal>,
    /// Accepted orders, in placement order.
    placed: Mutex<Vec<BetOrder>>,
    /// Sequence for synthetic bet IDs.
    sequence: AtomicU64,
}

impl PaperOrderSink {
    /// Create a sink with the given starting balance.
    ///
    /// # Errors
    /// Fails if the balance is not representable as a decimal.
    pub fn new(initial_balance: f64) -> Result<Self> {
        let balance = Decimal::from_f64(initial_balance)
            .with_context(|| format!("Invalid paper balance: {initial_balance}"))?
            .round_dp(2);
        Ok(Self {
            balance: Mutex::new(balance),
            placed: Mutex::new(Vec::new()),
            sequence: AtomicU64::new(0),
        })
    }

    /// Orders accepted so far.
    pub async fn placed_orders(&self) -> Vec<BetOrder> {
        self.placed.lock().await.clone()
    }

    /// Exact remaining balance.
    pub async fn balance(&self) -> Decimal {
        *self.balance.lock().await
    }
}

#[async_trait]
impl OrderSink for PaperOrderSink {
    async fn place_bet(&self, order: &BetOrder) -> Result<BetConfirmation> {
        let mut balance = self.balance.lock().await;
        if order.amount > *balance {
            warn!(
                market = %order.market_id,
                amount = %order.amount,
                balance = %*balance,
                "Paper bet rejected: insufficient balance"
            );
            return Ok(BetConfirmation {
                client_id: order.client_id,
                bet_id: String::new(),
                accepted: false,
                rejection_reason: Some("insufficient paper balance".to_string()),
            });
        }

        *balance -= order.amount;
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        self.placed.lock().await.push(order.clone());

        info!(
            market = %order.market_id,
            outcome = %order.outcome,
            amount = %order.amount,
            remaining = %*balance,
            "Paper bet placed"
        );

        Ok(BetConfirmation {
            client_id: order.client_id,
            bet_id: format!("paper-{seq}"),
            accepted: true,
            rejection_reason: None,
        })
    }

    async fn available_balance(&self) -> Result<f64> {
        self.balance
            .lock()
            .await
            .to_f64()
            .context("Paper balance not representable as f64")
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}
