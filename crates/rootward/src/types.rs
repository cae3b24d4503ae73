//! Domain types for path-to-GC-root analysis.
//!
//! These types represent the core domain model:
//! - **Identity**: `InstanceId` (an object in the heap snapshot)
//! - **Edges**: `ReferenceEdge`, `Reference` (what the heap reports)
//! - **Results**: `RootChain`, `PathOutcome`, `RootKey` (what the engine produces)
//!
//! ## Design Decisions
//!
//! | Decision | Choice | Rationale |
//! |----------|--------|-----------|
//! | Edge kind | Enum not trait object | Two closed cases, each with its own label |
//! | Chain storage | Flat `Vec` of edge records | Built once, read-only, no back-pointers |
//! | Unreachable bucket | `RootKey::Unreachable` | Keeps `Option` out of map keys |

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identity
// ============================================================================

/// Opaque identity of an object in the heap snapshot.
///
/// Identities are assigned by the heap collaborator and stay stable for the
/// snapshot's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub u64);

impl InstanceId {
    /// Create an instance ID from its raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Extract the raw u64 value.
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for InstanceId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Edges
// ============================================================================

/// How a referrer holds a reference to its referent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceEdge {
    /// An object field.
    Field {
        /// Field name as recorded in the snapshot.
        name: String,
    },
    /// A slot of an object array.
    ArrayIndex {
        /// Zero-based slot index.
        index: usize,
    },
}

impl ReferenceEdge {
    /// Create a field edge.
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field { name: name.into() }
    }

    /// Create an array slot edge.
    #[must_use]
    pub fn array_index(index: usize) -> Self {
        Self::ArrayIndex { index }
    }
}

impl fmt::Display for ReferenceEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field { name } => f.write_str(name),
            Self::ArrayIndex { index } => write!(f, "[{index}]"),
        }
    }
}

/// An outgoing reference as reported by the heap: a labeled edge to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// The field or slot holding the reference.
    pub edge: ReferenceEdge,
    /// The referenced instance.
    pub target: InstanceId,
}

impl Reference {
    /// Create a reference through `edge` to `target`.
    #[must_use]
    pub fn new(edge: ReferenceEdge, target: InstanceId) -> Self {
        Self { edge, target }
    }
}

// ============================================================================
// Chains
// ============================================================================

/// One step of a chain: `referrer` holds `referent` through `edge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEdge {
    /// Instance the step starts from.
    pub referrer: InstanceId,
    /// Instance the step arrives at, one hop closer to the root.
    pub referent: InstanceId,
    /// Field or slot label of the reference.
    pub edge: ReferenceEdge,
}

/// A hop the oracle claimed but the reference scan could not find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedHop {
    /// Instance whose references were scanned.
    pub from: InstanceId,
    /// Next hop claimed by the oracle.
    pub to: InstanceId,
}

/// The ordered chain of references from a start instance to its GC root.
///
/// The chain is read-only once built. Its last edge is the terminal step: the
/// one that arrives at the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootChain {
    start: InstanceId,
    root: InstanceId,
    edges: Vec<ChainEdge>,
    skipped: Vec<SkippedHop>,
}

impl RootChain {
    pub(crate) fn new(
        start: InstanceId,
        root: InstanceId,
        edges: Vec<ChainEdge>,
        skipped: Vec<SkippedHop>,
    ) -> Self {
        Self {
            start,
            root,
            edges,
            skipped,
        }
    }

    /// The instance the chain starts from.
    #[must_use]
    pub fn start(&self) -> InstanceId {
        self.start
    }

    /// The GC root the chain ends at.
    #[must_use]
    pub fn root(&self) -> InstanceId {
        self.root
    }

    /// The chain's steps, from the start instance toward the root.
    #[must_use]
    pub fn edges(&self) -> &[ChainEdge] {
        &self.edges
    }

    /// The step nearest the root. It has no further children.
    #[must_use]
    pub fn terminal(&self) -> Option<&ChainEdge> {
        self.edges.last()
    }

    /// Number of recorded steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` if no step could be recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Hops omitted because the heap had no matching reference.
    #[must_use]
    pub fn skipped_hops(&self) -> &[SkippedHop] {
        &self.skipped
    }

    /// Returns `true` if every hop toward the root was found in the heap.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Instances along the chain: the start, then each step's referent.
    pub fn instances(&self) -> impl Iterator<Item = InstanceId> + '_ {
        std::iter::once(self.start).chain(self.edges.iter().map(|e| e.referent))
    }
}

/// Result of looking for the path from one instance to its GC root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "chain", rename_all = "snake_case")]
pub enum PathOutcome {
    /// The instance is not reachable from any GC root.
    NoRoot,
    /// The instance is itself a GC root.
    IsRoot,
    /// The chain of references leading to the instance's nearest root.
    Chain(RootChain),
}

impl PathOutcome {
    /// The chain, if the instance has one.
    #[must_use]
    pub fn chain(&self) -> Option<&RootChain> {
        match self {
            Self::Chain(chain) => Some(chain),
            Self::NoRoot | Self::IsRoot => None,
        }
    }
}

// ============================================================================
// Grouping
// ============================================================================

/// The resolved ultimate root an instance is grouped under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootKey {
    /// Instances whose nearest-root pointers settle on this root.
    Root(InstanceId),
    /// Instances not reachable from any root.
    Unreachable,
}

impl RootKey {
    /// The root instance, or `None` for the unreachable bucket.
    #[must_use]
    pub fn instance(self) -> Option<InstanceId> {
        match self {
            Self::Root(id) => Some(id),
            Self::Unreachable => None,
        }
    }
}

impl From<Option<InstanceId>> for RootKey {
    fn from(root: Option<InstanceId>) -> Self {
        root.map_or(Self::Unreachable, Self::Root)
    }
}

impl fmt::Display for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root(id) => write!(f, "{id}"),
            Self::Unreachable => f.write_str("<no GC root>"),
        }
    }
}
