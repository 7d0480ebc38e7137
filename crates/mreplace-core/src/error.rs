//! Errors produced by the substitution engine

use std::collections::TryReserveError;
use thiserror::Error;

/// Errors that can occur while applying a rule set
///
/// Empty inputs, missing matches and overlapping patterns are all handled
/// cases with defined output. Only running out of memory is reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubstituteError {
    #[error("Failed to allocate substitution buffer: {0}")]
    AllocationFailure(#[from] TryReserveError),
}
