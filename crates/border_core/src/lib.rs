//! `border_core` — deterministic border-inspection Monte-Carlo engine.
//!
//! No IO, no network. All randomness flows through an explicitly passed
//! `&mut impl rand::Rng`; nothing here reads a clock or a global RNG.

mod bitset;
pub mod contamination;
mod errors;
pub mod inspection;
pub mod release;
pub mod rng;
mod types;

pub use bitset::ItemBitset;
pub use errors::{ConfigError, Diagnostic, DiagnosticKind, ErrorCategory};
pub use types::*;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

#[cfg(test)]
mod tests;
