//! Shared heap generators for rootward benchmarks.

// Benchmark utilities - pedantic lints not critical here
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(dead_code)]

use rootward::{InstanceId, MemoryHeap};

/// Base id for generated roots, well above any generated leaf.
pub const ROOT_BASE: u64 = 1 << 40;

/// A forest of `roots` chains, each `depth` hops long, with `leaves` leaves
/// spread evenly across the chain heads.
///
/// Returns the heap and the leaf ids.
pub fn generate_forest(roots: u64, depth: u64, leaves: u64) -> (MemoryHeap, Vec<InstanceId>) {
    let mut heap = MemoryHeap::new();
    let mut heads = Vec::new();

    for r in 0..roots {
        let root = InstanceId::new(ROOT_BASE + r * (depth + 1));
        heap.mark_root(root);

        let mut below = root;
        for hop in 1..=depth {
            let holder = InstanceId::new(root.as_u64() + hop);
            heap.add_field(holder, "next", below)
                .set_root_pointer(holder, below);
            below = holder;
        }
        heads.push(below);
    }

    let leaf_ids: Vec<_> = (0..leaves).map(InstanceId::new).collect();
    for &leaf in &leaf_ids {
        let head = heads[usize::try_from(leaf.as_u64() % roots).expect("fits in usize")];
        heap.add_field(leaf, "owner", head)
            .set_root_pointer(leaf, head);
    }

    (heap, leaf_ids)
}

/// A single chain of `length` hops; returns the heap and the chain's start.
pub fn generate_chain(length: u64) -> (MemoryHeap, InstanceId) {
    let mut heap = MemoryHeap::new();
    for raw in 0..length {
        let (from, to) = (InstanceId::new(raw), InstanceId::new(raw + 1));
        heap.add_field(from, "next", to)
            .set_root_pointer(from, to);
    }
    heap.mark_root(InstanceId::new(length));
    (heap, InstanceId::new(0))
}
