//! Presentation-ready analysis results.
//!
//! A [`RootsReport`] is what a host renders in its GC root view. It folds the
//! engine's outcomes into the cases a user sees, including the ones that are
//! not errors from the user's point of view (no root, out of memory).

use std::fmt;

use crate::aggregate::{RootGroup, RootGroups};
use crate::types::{PathOutcome, RootChain};

/// Label shown for instances not reachable from any GC root.
pub const NO_ROOT_LABEL: &str = "<no GC root>";

/// Label shown for an instance that is itself a GC root.
pub const IS_ROOT_LABEL: &str = "<node is GC root>";

/// Label shown when aggregation ran out of memory.
pub const OUT_OF_MEMORY_LABEL: &str = "<out of memory - results incomplete>";

/// Result of a GC root analysis, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootsReport {
    /// Nothing is reachable from a GC root.
    NoRoot,
    /// The selected instance is a GC root.
    IsRoot,
    /// The path from the selected instance to its root.
    Path(RootChain),
    /// All instances share one root; shown without a grouping level.
    SingleGroup(RootGroup),
    /// Instances grouped by root.
    Groups(RootGroups),
    /// Aggregation ran out of memory and its partial results were discarded.
    OutOfMemory,
}

impl RootsReport {
    /// Report for a single-instance path lookup.
    #[must_use]
    pub fn from_path(outcome: PathOutcome) -> Self {
        match outcome {
            PathOutcome::NoRoot => Self::NoRoot,
            PathOutcome::IsRoot => Self::IsRoot,
            PathOutcome::Chain(chain) => Self::Path(chain),
        }
    }

    /// Report for an aggregation, unwrapping a lone group.
    #[must_use]
    pub fn from_groups(groups: RootGroups) -> Self {
        if groups.is_empty() {
            return Self::NoRoot;
        }
        if groups.len() == 1 {
            if let Some(group) = groups.into_groups().pop() {
                return Self::SingleGroup(group);
            }
            return Self::NoRoot;
        }
        Self::Groups(groups)
    }
}

impl fmt::Display for RootsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRoot => f.write_str(NO_ROOT_LABEL),
            Self::IsRoot => f.write_str(IS_ROOT_LABEL),
            Self::OutOfMemory => f.write_str(OUT_OF_MEMORY_LABEL),
            Self::Path(chain) => write!(
                f,
                "{} -> {} ({} steps)",
                chain.start(),
                chain.root(),
                chain.len()
            ),
            Self::SingleGroup(group) => write!(f, "{} ({} instances)", group.key(), group.count()),
            Self::Groups(groups) => write!(
                f,
                "{} GC roots ({} instances)",
                groups.len(),
                groups.total_members()
            ),
        }
    }
}
