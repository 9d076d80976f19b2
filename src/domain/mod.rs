//! Domain layer - Pricing, sizing and decision logic.
//!
//! Pure, synchronous and free of I/O (hexagonal architecture inner ring).
//! Every search is bisection with a fixed iteration cap, so each call
//! terminates in bounded time whatever the inputs.

pub mod error;
pub mod kelly;
pub mod lmsr;
pub mod policy;
pub mod trade;

// Re-export core types for convenience
pub use error::{EngineError, EngineResult};
pub use kelly::{KellySizer, SizingTolerances, kelly_fraction_at, size_bet};
pub use lmsr::{LmsrModel, PricingConfig, price_trade};
pub use policy::{
    ConfidenceScaling, Decision, DecisionPolicy, PolicyConfig, SizingStrategy, SkipReason, decide,
};
pub use trade::{
    BeliefEstimate, BindingConstraint, Direction, MarketId, MarketQuote, Outcome,
    SizingDiagnostics, SizingParameters, SizingResult, Trade, TradeImpact,
};
