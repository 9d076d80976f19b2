//! Domain error types.
//!
//! Every failure in the pricing and sizing core is a deterministic
//! function of its inputs, so nothing here is retryable. Callers must
//! treat `DegenerateMarket` as "untradeable", never as "use 0.5".

use thiserror::Error;

/// Errors raised by the pricing model, the sizing engine and the policy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// An input value is out of its domain (negative amount, probability
    /// outside (0, 1), non-finite number, ...).
    #[error("invalid input: {message}")]
    InvalidInput {
        /// What was wrong.
        message: String,
    },

    /// A configuration value is unusable (non-positive liquidity,
    /// Kelly fraction outside (0, 1], ...).
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        /// What was wrong.
        message: String,
    },

    /// The share solver could not resolve a trade because the quote sits
    /// too close to a probability asymptote.
    #[error(
        "degenerate market at p={probability:.12} after {iterations} iterations: {reason}"
    )]
    DegenerateMarket {
        /// Quoted YES probability of the market.
        probability: f64,
        /// Iterations spent before giving up.
        iterations: u32,
        /// Why the market was rejected.
        reason: String,
    },
}

impl EngineError {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Whether the error marks the market itself as untradeable, as
    /// opposed to a caller mistake.
    pub const fn is_degenerate(&self) -> bool {
        matches!(self, Self::DegenerateMarket { .. })
    }
}

/// Shorthand result for domain operations.
pub type EngineResult<T> = Result<T, EngineError>;
