//! Lifecycle state machines for connections and stacks.
//!
//! Every transition re-reads its precondition inside the store
//! transaction that performs the write, so concurrent attempts on the
//! same row serialize and the loser fails with Conflict.

pub mod connection;
pub mod stack;

pub use connection::{ApprovalOutcome, ConnectionLifecycle};
pub use stack::StackLifecycle;

use std::fmt;

use crate::error::{EngineError, Result};

/// Shared transition precondition: the row must currently be in
/// `expected`, otherwise Conflict. Every transition path goes through
/// this so preconditions are enforced identically.
pub(crate) fn require_status<S>(entity: &'static str, id: &str, actual: S, expected: S) -> Result<()>
where
    S: PartialEq + fmt::Display,
{
    if actual == expected {
        Ok(())
    } else {
        Err(EngineError::conflict(format!(
            "{entity} {id} is {actual}, expected {expected}"
        )))
    }
}
