//! mreplace-core: Single-pass multi-pattern literal substitution
//!
//! This crate provides:
//! - `RuleSet`: Ordered pattern -> replacement mapping (last write wins, first insert orders)
//! - `SubstitutionEngine`: Prepared rule index that rewrites documents in one pass
//! - `Substitution`: Output text plus the matches that produced it
//! - `apply()`: One-shot helper for a single document

mod engine;
mod error;
mod rule;

pub use engine::{apply, Match, Matches, Substitution, SubstitutionEngine};
pub use error::SubstituteError;
pub use rule::{Rule, RuleSet};
