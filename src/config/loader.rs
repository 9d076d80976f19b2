//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Arguments
/// * `path` - Path to the config.toml file
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    markets = config.markets.len(),
    kelly = config.sizing.kelly_fraction,
    max_impact = config.sizing.max_probability_impact,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
///
/// # Errors
/// Returns error on TOML syntax errors or validation failures.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content)
    .with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Sizing limits and solver settings accepted by the domain
/// - Policy gates inside [0, 1]
/// - A usable order throttle
/// - Unique, well-formed market definitions
fn validate_config(config: &AppConfig) -> Result<()> {
  config.sizing.validate().context("Invalid [sizing] section")?;
  config.pricing.validate().context("Invalid [pricing] section")?;
  config.search.validate().context("Invalid [search] section")?;

  // Policy validation
  anyhow::ensure!(
    (0.0..1.0).contains(&config.policy.materiality_threshold),
    "policy materiality_threshold must be in [0, 1), got {}",
    config.policy.materiality_threshold
  );
  anyhow::ensure!(
    (0.0..=1.0).contains(&config.policy.min_confidence),
    "policy min_confidence must be in [0, 1], got {}",
    config.policy.min_confidence
  );

  // Session validation
  anyhow::ensure!(
    config.session.orders_per_minute > 0,
    "session orders_per_minute must be positive"
  );
  anyhow::ensure!(
    config.bot.paper_balance >= 0.0,
    "bot paper_balance must be non-negative, got {}",
    config.bot.paper_balance
  );

  // Market validation
  let mut seen = HashSet::new();
  for (i, market) in config.markets.iter().enumerate() {
    anyhow::ensure!(!market.id.is_empty(), "Market {i} has empty id");
    anyhow::ensure!(
      seen.insert(market.id.as_str()),
      "Market {} is configured twice",
      market.id
    );
    anyhow::ensure!(
      market.probability > 0.0 && market.probability < 1.0,
      "Market {} probability must be in (0, 1), got {}",
      market.id,
      market.probability
    );
    anyhow::ensure!(
      market.liquidity > 0.0,
      "Market {} liquidity must be positive, got {}",
      market.id,
      market.liquidity
    );
    if let Some(belief) = market.belief {
      anyhow::ensure!(
        belief > 0.0 && belief < 1.0,
        "Market {} belief must be in (0, 1), got {belief}",
        market.id
      );
    }
    anyhow::ensure!(
      (0.0..=1.0).contains(&market.confidence),
      "Market {} confidence must be in [0, 1], got {}",
      market.id,
      market.confidence
    );
  }

  Ok(())
}
