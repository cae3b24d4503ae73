//! In-memory heap snapshot using petgraph.
//!
//! Instances are graph nodes and references are labeled edges pointing from
//! referrer to referent. Nearest-root pointers are stored beside the graph,
//! since they come from an oracle rather than from the references themselves.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use super::HeapGraph;
use crate::types::{InstanceId, Reference, ReferenceEdge};

/// A heap snapshot held entirely in memory.
///
/// Built incrementally through `add_*` calls, then read through [`HeapGraph`].
/// Unknown instances have no references and no root pointer.
#[derive(Debug, Default, Clone)]
pub struct MemoryHeap {
    graph: DiGraph<InstanceId, ReferenceEdge>,
    node_map: HashMap<InstanceId, NodeIndex>,
    root_pointers: HashMap<InstanceId, InstanceId>,
}

impl MemoryHeap {
    /// Create an empty heap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance with no references. Adding a known instance is a no-op.
    pub fn add_instance(&mut self, instance: InstanceId) -> &mut Self {
        self.node(instance);
        self
    }

    /// Record that `from` holds `to` in field `name`.
    pub fn add_field(
        &mut self,
        from: InstanceId,
        name: impl Into<String>,
        to: InstanceId,
    ) -> &mut Self {
        self.add_reference(from, ReferenceEdge::field(name), to)
    }

    /// Record that array `from` holds `to` at slot `index`.
    pub fn add_array_item(&mut self, from: InstanceId, index: usize, to: InstanceId) -> &mut Self {
        self.add_reference(from, ReferenceEdge::array_index(index), to)
    }

    /// Record a reference from `from` to `to` through `edge`.
    pub fn add_reference(
        &mut self,
        from: InstanceId,
        edge: ReferenceEdge,
        to: InstanceId,
    ) -> &mut Self {
        let from_node = self.node(from);
        let to_node = self.node(to);
        self.graph.add_edge(from_node, to_node, edge);
        self
    }

    /// Set the oracle's next hop from `instance` toward its nearest root.
    pub fn set_root_pointer(&mut self, instance: InstanceId, next: InstanceId) -> &mut Self {
        self.node(instance);
        self.node(next);
        self.root_pointers.insert(instance, next);
        self
    }

    /// Mark `instance` as a GC root (its root pointer is itself).
    pub fn mark_root(&mut self, instance: InstanceId) -> &mut Self {
        self.set_root_pointer(instance, instance)
    }

    /// Number of instances in the heap.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of references in the heap.
    #[must_use]
    pub fn reference_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns `true` if the instance has been added.
    #[must_use]
    pub fn contains(&self, instance: InstanceId) -> bool {
        self.node_map.contains_key(&instance)
    }

    /// All instances, in the order they were first added.
    pub fn instances(&self) -> impl ExactSizeIterator<Item = InstanceId> + '_ {
        self.graph.node_indices().map(|node| self.graph[node])
    }

    fn node(&mut self, instance: InstanceId) -> NodeIndex {
        if let Some(&node) = self.node_map.get(&instance) {
            return node;
        }
        let node = self.graph.add_node(instance);
        self.node_map.insert(instance, node);
        node
    }
}

impl HeapGraph for MemoryHeap {
    fn nearest_root_pointer(&self, instance: InstanceId) -> Option<InstanceId> {
        self.root_pointers.get(&instance).copied()
    }

    fn outgoing_references(&self, instance: InstanceId) -> Vec<Reference> {
        let Some(&node) = self.node_map.get(&instance) else {
            return Vec::new();
        };

        // petgraph walks a node's edge list newest first
        let mut references: Vec<Reference> = self
            .graph
            .edges(node)
            .map(|edge| Reference::new(edge.weight().clone(), self.graph[edge.target()]))
            .collect();
        references.reverse();
        references
    }
}
