//! Error types for rootward operations.
//!
//! Errors fall into three groups:
//!
//! - **Outcome errors**: `Interrupted` and `OutOfMemory` are expected results of a
//!   long-running analysis. Callers render them to the user and may retry with a
//!   fresh call.
//! - **Heap errors**: `Inconsistent` means the nearest-root oracle and the
//!   reference scan disagree about the snapshot.
//! - **Infrastructure errors**: configuration and I/O failures, plus misuse of the
//!   progress state machine.
//!
//! No variant is ever retried automatically.

use std::fmt;

use thiserror::Error;

use crate::types::InstanceId;

/// Result type for rootward operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for rootward operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Cooperative cancellation was observed mid-operation.
    #[error("operation interrupted")]
    Interrupted,

    /// Allocation failed while building bookkeeping for a large input.
    #[error("out of memory while {context}")]
    OutOfMemory {
        /// What the engine was allocating for.
        context: &'static str,
    },

    /// The nearest-root oracle and the reference scan disagree.
    #[error("inconsistent heap: {0}")]
    Inconsistent(Inconsistency),

    /// A progress operation was called in a state that does not allow it.
    #[error("progress `{operation}` is not valid in state {state}")]
    InvalidProgressState {
        /// The rejected operation (`setup`, `step`).
        operation: &'static str,
        /// The state the tracker was in.
        state: &'static str,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// File system operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an out-of-memory error for the given allocation site.
    #[must_use]
    pub fn out_of_memory(context: &'static str) -> Self {
        Self::OutOfMemory { context }
    }

    /// Returns `true` if the operation stopped because of cancellation.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }

    /// Returns `true` if the operation ran out of memory.
    #[must_use]
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }

    /// Returns `true` if the heap snapshot itself is inconsistent.
    #[must_use]
    pub fn is_inconsistency(&self) -> bool {
        matches!(self, Self::Inconsistent(_))
    }

    /// The message a host application shows in place of the result.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Interrupted => "<operation interrupted>".to_string(),
            Self::OutOfMemory { .. } => "<out of memory - results incomplete>".to_string(),
            other => format!("<{other}>"),
        }
    }
}

/// A disagreement between the nearest-root oracle and the heap's references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inconsistency {
    /// The oracle names `expected` as the next hop from `from`, but `from` has no
    /// reference to it.
    MissingEdge {
        /// Instance whose references were scanned.
        from: InstanceId,
        /// Next hop claimed by the oracle.
        expected: InstanceId,
    },

    /// Following the oracle from `start` reached `revisited` twice.
    OracleCycle {
        /// Instance the walk started from.
        start: InstanceId,
        /// First instance seen a second time.
        revisited: InstanceId,
    },

    /// `instance` lies on a root path, but the oracle gives it no next hop.
    DanglingPointer {
        /// Instance the walk started from.
        start: InstanceId,
        /// Instance with no nearest-root pointer.
        instance: InstanceId,
    },

    /// Following the oracle from `start` did not settle within `limit` hops.
    ChainTooLong {
        /// Instance the walk started from.
        start: InstanceId,
        /// Configured hop budget.
        limit: usize,
    },
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEdge { from, expected } => write!(
                f,
                "{from} has no reference to its nearest-root pointer {expected}"
            ),
            Self::OracleCycle { start, revisited } => write!(
                f,
                "nearest-root pointers from {start} loop back to {revisited}"
            ),
            Self::DanglingPointer { start, instance } => write!(
                f,
                "{instance} on the root path of {start} has no nearest-root pointer"
            ),
            Self::ChainTooLong { start, limit } => write!(
                f,
                "nearest-root pointers from {start} exceed {limit} hops"
            ),
        }
    }
}

impl From<Inconsistency> for Error {
    fn from(inconsistency: Inconsistency) -> Self {
        Self::Inconsistent(inconsistency)
    }
}
