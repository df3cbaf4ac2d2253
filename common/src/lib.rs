//! fxbrief Common Types
//!
//! Shared types used across the fxbrief workspace: currency codes, ordered
//! currency pairs, decimal rounding helpers and time utilities.

pub mod monetary;
pub mod time;

pub use monetary::*;
pub use time::*;
