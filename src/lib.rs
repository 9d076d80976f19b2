//! LMSR Kelly Sizer - Library Root
//!
//! Impact-aware fractional Kelly bet sizing for binary prediction
//! markets priced by an LMSR market maker.
//!
//! Re-exports all modules for the binary, integration tests and
//! benchmarks.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
