//! Heap fixtures shared across integration tests.

#![allow(dead_code)]

use rootward::{
    CancellationToken, InstanceId, MemoryHeap, Progress, ProgressSnapshot, ProgressTracker, Result,
};

/// Shorthand for an instance id.
pub fn id(raw: u64) -> InstanceId {
    InstanceId::new(raw)
}

/// `A --f1--> B --f2--> C`, with C a GC root.
///
/// Returns the heap and `(a, b, c)`.
pub fn three_step_chain() -> (MemoryHeap, (InstanceId, InstanceId, InstanceId)) {
    let (a, b, c) = (id(1), id(2), id(3));
    let mut heap = MemoryHeap::new();
    heap.add_field(a, "f1", b)
        .add_field(b, "f2", c)
        .set_root_pointer(a, b)
        .set_root_pointer(b, c)
        .mark_root(c);
    (heap, (a, b, c))
}

/// X and Y reach root R; Z reaches root S; U is unreachable.
pub struct TwoRoots {
    pub heap: MemoryHeap,
    pub x: InstanceId,
    pub y: InstanceId,
    pub z: InstanceId,
    pub u: InstanceId,
    pub r: InstanceId,
    pub s: InstanceId,
}

pub fn two_roots() -> TwoRoots {
    let (x, y, z, u) = (id(10), id(11), id(12), id(13));
    let (r, s) = (id(100), id(200));
    let mid = id(50);

    let mut heap = MemoryHeap::new();
    heap.add_field(x, "owner", mid)
        .add_field(mid, "registry", r)
        .add_field(y, "owner", r)
        .add_array_item(z, 4, s)
        .add_instance(u)
        .set_root_pointer(x, mid)
        .set_root_pointer(mid, r)
        .set_root_pointer(y, r)
        .set_root_pointer(z, s)
        .mark_root(r)
        .mark_root(s);

    TwoRoots {
        heap,
        x,
        y,
        z,
        u,
        r,
        s,
    }
}

/// `n` instances in a line ending at a root: `1 -> 2 -> ... -> n`.
pub fn linear_chain(n: u64) -> MemoryHeap {
    let mut heap = MemoryHeap::new();
    for raw in 1..n {
        heap.add_field(id(raw), "next", id(raw + 1))
            .set_root_pointer(id(raw), id(raw + 1));
    }
    heap.mark_root(id(n));
    heap
}

/// `n` leaves fanned out over `roots` roots, leaf `i` pointing at root `i % roots`.
pub fn fan_in(n: u64, roots: u64) -> (MemoryHeap, Vec<InstanceId>) {
    let mut heap = MemoryHeap::new();
    let root_base = 1_000_000;
    for r in 0..roots {
        heap.mark_root(id(root_base + r));
    }
    let leaves: Vec<_> = (0..n).map(id).collect();
    for &leaf in &leaves {
        let root = id(root_base + leaf.as_u64() % roots);
        heap.add_field(leaf, "holder", root)
            .set_root_pointer(leaf, root);
    }
    (heap, leaves)
}

/// Progress sink that cancels a token once `after` steps were recorded.
pub struct CancelAfter {
    tracker: ProgressTracker,
    cancel: CancellationToken,
    after: u64,
}

impl CancelAfter {
    pub fn new(cancel: CancellationToken, after: u64) -> Self {
        Self {
            tracker: ProgressTracker::new(),
            cancel,
            after,
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.tracker.snapshot()
    }
}

impl Progress for CancelAfter {
    fn setup_known_steps(&self, total: u64) -> Result<()> {
        self.tracker.setup_known_steps(total)
    }

    fn setup_unknown_steps(&self) -> Result<()> {
        self.tracker.setup_unknown_steps()
    }

    fn step(&self) -> Result<()> {
        self.tracker.step()?;
        if self.tracker.snapshot().steps_done >= self.after {
            self.cancel.cancel();
        }
        Ok(())
    }

    fn finish(&self) {
        self.tracker.finish();
    }
}
