//! Access to the heap snapshot being analyzed.
//!
//! The engine never parses or stores snapshots itself. A host supplies a
//! [`HeapGraph`]: a read-only view exposing each instance's outgoing references
//! and a precomputed nearest-GC-root oracle.
//!
//! ## Design
//!
//! - `HeapGraph` is the only seam to the snapshot; both algorithms are generic over it
//! - Implementations must be `Sync` so root resolution can fan out across threads
//! - [`MemoryHeap`] is a petgraph-backed implementation for small snapshots and tests

mod memory;

pub use memory::MemoryHeap;

use crate::error::Result;
use crate::types::{InstanceId, Reference, ReferenceEdge};

/// Read-only view of a heap snapshot.
pub trait HeapGraph: Sync {
    /// The next hop from `instance` toward its nearest GC root.
    ///
    /// Returns `None` if the instance is unreachable from any root, and
    /// `instance` itself if it is a root.
    fn nearest_root_pointer(&self, instance: InstanceId) -> Option<InstanceId>;

    /// References held by `instance`, in the snapshot's field/slot order.
    fn outgoing_references(&self, instance: InstanceId) -> Vec<Reference>;

    /// The first reference `from` holds to `to`, if any.
    fn reference_to(&self, from: InstanceId, to: InstanceId) -> Option<ReferenceEdge> {
        self.outgoing_references(from)
            .into_iter()
            .find(|reference| reference.target == to)
            .map(|reference| reference.edge)
    }

    /// Make sure the nearest-root oracle is ready before an analysis starts.
    ///
    /// Called once per analysis. Snapshots that compute root pointers lazily do the
    /// work here; the default does nothing.
    fn prepare_roots(&self) -> Result<()> {
        Ok(())
    }
}

impl<H: HeapGraph + ?Sized> HeapGraph for &H {
    fn nearest_root_pointer(&self, instance: InstanceId) -> Option<InstanceId> {
        (**self).nearest_root_pointer(instance)
    }

    fn outgoing_references(&self, instance: InstanceId) -> Vec<Reference> {
        (**self).outgoing_references(instance)
    }

    fn reference_to(&self, from: InstanceId, to: InstanceId) -> Option<ReferenceEdge> {
        (**self).reference_to(from, to)
    }

    fn prepare_roots(&self) -> Result<()> {
        (**self).prepare_roots()
    }
}
