//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer
//! requires from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `MarketSource`: Current pricing state of a market
//! - `OrderSink`: Bet placement and balance
//! - `BeliefSource`: Probability estimates for a market

pub mod belief;
pub mod execution;
pub mod market_source;
