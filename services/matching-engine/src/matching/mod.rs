//! Matching logic
//!
//! Crossing detection and the execution sweep.

pub mod crossing;
pub mod executor;

pub use executor::{match_limit, match_market, MatchOutcome};
