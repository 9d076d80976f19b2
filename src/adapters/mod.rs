//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! in-process backends. Each sub-module groups adapters by concern.
//!
//! Adapter categories:
//! - `markets`: Config-backed market snapshots
//! - `paper`: Paper-balance order sink for dry runs
//! - `beliefs`: Fixed, rule-based and closure-backed belief sources

pub mod beliefs;
pub mod markets;
pub mod paper;
