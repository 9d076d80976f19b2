//! Configuration Module - TOML-based Sizer Configuration
//!
//! Loads and validates configuration from `config.toml`.
//! Every numeric knob of the engine (sizing limits, solver tolerances,
//! policy gates) is externalized here - the domain layer only carries
//! defaults.

pub mod loader;

use serde::Deserialize;

use crate::domain::kelly::{KellySizer, SizingTolerances};
use crate::domain::lmsr::PricingConfig;
use crate::domain::policy::{DecisionPolicy, PolicyConfig};
use crate::domain::trade::{MarketId, SizingParameters};

/// Top-level configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before a session begins.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Bot identity and run mode.
  pub bot: BotConfig,
  /// Kelly sizing limits.
  #[serde(default)]
  pub sizing: SizingParameters,
  /// Materiality/confidence gates and sizing strategy.
  #[serde(default)]
  pub policy: PolicyConfig,
  /// LMSR share solver.
  #[serde(default)]
  pub pricing: PricingConfig,
  /// Fixed-point and impact-ceiling searches.
  #[serde(default)]
  pub search: SizingTolerances,
  /// Session loop limits.
  #[serde(default)]
  pub session: SessionConfig,
  /// Markets to evaluate.
  #[serde(default)]
  pub markets: Vec<MarketConfig>,
}

impl AppConfig {
  /// Decision policy wired with the configured solver settings.
  pub const fn decision_policy(&self) -> DecisionPolicy {
    DecisionPolicy::new(self.policy, KellySizer::new(self.pricing, self.search))
  }

  /// IDs of the configured markets, in file order.
  pub fn market_ids(&self) -> Vec<MarketId> {
    self.markets.iter().map(|m| m.id.clone()).collect()
  }
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
  /// Human-readable bot name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Decide and log, but submit nothing.
  #[serde(default)]
  pub dry_run: bool,
  /// Starting balance of the paper order sink.
  #[serde(default = "default_paper_balance")]
  pub paper_balance: f64,
}

/// Session loop configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
  /// Maximum bets placed in one session.
  pub max_bets: usize,
  /// Order throttle.
  pub orders_per_minute: u32,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      max_bets: default_max_bets(),
      orders_per_minute: default_orders_per_minute(),
    }
  }
}

/// One statically described market and the fixed belief held about it.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
  /// Market identifier.
  pub id: MarketId,
  /// Question text.
  #[serde(default)]
  pub question: String,
  /// Quoted YES probability.
  pub probability: f64,
  /// LMSR liquidity parameter.
  pub liquidity: f64,
  /// Already resolved markets are skipped.
  #[serde(default)]
  pub resolved: bool,
  /// Believed YES probability; markets without one are skipped.
  pub belief: Option<f64>,
  /// Confidence in `belief`.
  #[serde(default = "default_confidence")]
  pub confidence: f64,
  /// Optional note logged with the decision.
  #[serde(default)]
  pub rationale: Option<String>,
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_paper_balance() -> f64 {
  1000.0
}

fn default_max_bets() -> usize {
  5
}

fn default_orders_per_minute() -> u32 {
  30
}

fn default_confidence() -> f64 {
  0.7
}
