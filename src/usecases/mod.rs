//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement
//! the sizer's workflows.
//!
//! Use cases:
//! - `SessionRunner`: One decide-and-bet pass over a set of markets

pub mod session;
