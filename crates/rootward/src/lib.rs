//! # Rootward: Path-to-GC-Root Analysis for Heap Snapshots
//!
//! Rootward answers "why is this object still alive?" for a heap snapshot. Given
//! a snapshot exposing each object's references and a precomputed nearest-GC-root
//! oracle, it builds the reference chain from one object to its root, or groups
//! millions of objects by the root they ultimately reach.
//!
//! ## Design Philosophy
//!
//! - **Oracle, not collector** - Root reachability is precomputed by the snapshot; rootward follows it
//! - **Cancellable** - Every long loop polls a [`CancellationToken`] and stops with `Error::Interrupted`
//! - **Memory aware** - Aggregation bookkeeping is allocated fallibly and reports `Error::OutOfMemory`
//! - **Embeddable** - No UI, no I/O beyond optional config loading; hosts run it on a worker thread
//!
//! ## Quick Start
//!
//! ```
//! use rootward::{CancellationToken, InstanceId, MemoryHeap, NoProgress, RootAnalyzer};
//!
//! let (a, b, c) = (InstanceId::new(1), InstanceId::new(2), InstanceId::new(3));
//! let mut heap = MemoryHeap::new();
//! heap.add_field(a, "f1", b)
//!     .add_field(b, "f2", c)
//!     .set_root_pointer(a, b)
//!     .set_root_pointer(b, c)
//!     .mark_root(c);
//!
//! let analyzer = RootAnalyzer::new(&heap);
//! let cancel = CancellationToken::new();
//!
//! let outcome = analyzer.build_path(a, &NoProgress, &cancel)?;
//! let chain = outcome.chain().expect("a reaches c");
//! assert_eq!(chain.root(), c);
//!
//! let groups = analyzer.aggregate([a, b], 2, &NoProgress, &cancel)?;
//! assert_eq!(groups.for_root(c).map(|g| g.count()), Some(2));
//! # Ok::<(), rootward::Error>(())
//! ```

mod aggregate;
mod batch;
mod cancel;
mod config;
mod error;
mod heap;
mod path;
mod progress;
mod report;
mod types;

pub use aggregate::{RootAggregator, RootGroup, RootGroups};
pub use batch::{
    MoreMarker, NodeBatcher, Noun, Page, Presentation, SampleMarker, Window,
};
pub use cancel::CancellationToken;
pub use config::{
    DEFAULT_MAX_PAGE_NODES, DEFAULT_MAX_ROOT_DISTANCE, EngineConfig, MissingEdgePolicy,
    OverflowMode,
};
pub use error::{Error, Inconsistency, Result};
pub use heap::{HeapGraph, MemoryHeap};
pub use path::PathBuilder;
pub use progress::{NoProgress, Progress, ProgressSnapshot, ProgressState, ProgressTracker};
pub use report::{IS_ROOT_LABEL, NO_ROOT_LABEL, OUT_OF_MEMORY_LABEL, RootsReport};
pub use types::{
    ChainEdge, InstanceId, PathOutcome, Reference, ReferenceEdge, RootChain, RootKey, SkippedHop,
};

use std::cmp::Reverse;

use tracing::{info, warn};

/// Entry point for GC root analysis over one heap snapshot.
///
/// `RootAnalyzer` pairs a [`HeapGraph`] with an [`EngineConfig`] and exposes the
/// operations a heap viewer needs: single-instance paths, root aggregation, and
/// paging of the results. Every call runs synchronously on the caller's thread;
/// hosts are expected to call it from a background worker.
#[derive(Debug)]
pub struct RootAnalyzer<'h, H: HeapGraph + ?Sized> {
    heap: &'h H,
    config: EngineConfig,
}

impl<'h, H: HeapGraph + ?Sized> RootAnalyzer<'h, H> {
    /// Create an analyzer with the default configuration.
    pub fn new(heap: &'h H) -> Self {
        Self {
            heap,
            config: EngineConfig::default(),
        }
    }

    /// Create an analyzer with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration fails validation.
    pub fn with_config(heap: &'h H, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { heap, config })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A path builder using this analyzer's missing-edge policy.
    #[must_use]
    pub fn path_builder(&self) -> PathBuilder<'h, H> {
        PathBuilder::new(self.heap).with_missing_edge(self.config.missing_edge)
    }

    /// An aggregator using this analyzer's hop budget.
    #[must_use]
    pub fn aggregator(&self) -> RootAggregator<'h, H> {
        RootAggregator::new(self.heap).with_max_root_distance(self.config.max_root_distance)
    }

    // === Paths ===

    /// Build the path from `instance` to its nearest GC root.
    ///
    /// # Errors
    ///
    /// See [`PathBuilder::build_path`]; also propagates failures from
    /// [`HeapGraph::prepare_roots`].
    pub fn build_path(
        &self,
        instance: InstanceId,
        progress: &dyn Progress,
        cancel: &CancellationToken,
    ) -> Result<PathOutcome> {
        self.heap.prepare_roots()?;
        self.path_builder().build_path(instance, progress, cancel)
    }

    /// Build the path for member `index` of `group`.
    ///
    /// Members of the unreachable bucket report `NoRoot` without walking.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `index` is out of range, otherwise as
    /// [`build_path`](Self::build_path).
    pub fn member_path(
        &self,
        group: &RootGroup,
        index: usize,
        progress: &dyn Progress,
        cancel: &CancellationToken,
    ) -> Result<PathOutcome> {
        let Some(&member) = group.members().get(index) else {
            return Err(Error::Config(format!(
                "member index {index} out of range for group of {}",
                group.count()
            )));
        };
        if !group.members_expandable() {
            return Ok(PathOutcome::NoRoot);
        }
        self.build_path(member, progress, cancel)
    }

    // === Aggregation ===

    /// Group `instances` by the GC root each ultimately reaches.
    ///
    /// With `parallel-aggregation` enabled the instances are collected first and
    /// resolved on the rayon pool; the groups are the same either way.
    ///
    /// # Errors
    ///
    /// See [`RootAggregator::aggregate`].
    pub fn aggregate<I>(
        &self,
        instances: I,
        expected_count: usize,
        progress: &dyn Progress,
        cancel: &CancellationToken,
    ) -> Result<RootGroups>
    where
        I: IntoIterator<Item = InstanceId>,
    {
        self.heap.prepare_roots()?;
        let aggregator = self.aggregator();

        if !self.config.parallel_aggregation {
            return aggregator.aggregate(instances, expected_count, progress, cancel);
        }

        let mut collected = Vec::new();
        collected
            .try_reserve_exact(expected_count)
            .map_err(|_| Error::out_of_memory("collecting instances to aggregate"))?;
        collected.extend(instances);
        aggregator.aggregate_parallel(&collected, progress, cancel)
    }

    // === Reports ===

    /// Analyze one instance and fold the outcome into a report.
    ///
    /// # Errors
    ///
    /// `Error::Interrupted` and heap inconsistencies are returned as errors.
    pub fn analyze_instance(
        &self,
        instance: InstanceId,
        progress: &dyn Progress,
        cancel: &CancellationToken,
    ) -> Result<RootsReport> {
        let outcome = self.build_path(instance, progress, cancel)?;
        Ok(RootsReport::from_path(outcome))
    }

    /// Aggregate many instances and fold the result into a report.
    ///
    /// Running out of memory is reported as [`RootsReport::OutOfMemory`] rather
    /// than as an error.
    ///
    /// # Errors
    ///
    /// `Error::Interrupted` and heap inconsistencies are returned as errors.
    pub fn analyze_instances<I>(
        &self,
        instances: I,
        expected_count: usize,
        progress: &dyn Progress,
        cancel: &CancellationToken,
    ) -> Result<RootsReport>
    where
        I: IntoIterator<Item = InstanceId>,
    {
        match self.aggregate(instances, expected_count, progress, cancel) {
            Ok(groups) => {
                info!(groups = groups.len(), "GC root aggregation complete");
                Ok(RootsReport::from_groups(groups))
            }
            Err(err) if err.is_out_of_memory() => {
                warn!(error = %err, "GC root aggregation ran out of memory");
                Ok(RootsReport::OutOfMemory)
            }
            Err(err) => Err(err),
        }
    }

    // === Paging ===

    /// Pager over `groups`, largest group first.
    #[must_use]
    pub fn group_batcher<'g>(&self, groups: &'g RootGroups) -> NodeBatcher<'g, RootGroup> {
        NodeBatcher::new(groups.as_slice(), Noun::GcRoots)
            .with_config(&self.config)
            .sorted_by_key(|group: &RootGroup| Reverse(group.count()))
    }

    /// Pager over the members of `group`, in aggregation order.
    #[must_use]
    pub fn member_batcher<'g>(&self, group: &'g RootGroup) -> NodeBatcher<'g, InstanceId> {
        NodeBatcher::new(group.members(), Noun::Instances).with_config(&self.config)
    }

    /// Pager over the steps of `chain`, start first.
    #[must_use]
    pub fn chain_batcher<'c>(&self, chain: &'c RootChain) -> NodeBatcher<'c, ChainEdge> {
        NodeBatcher::new(chain.edges(), Noun::Steps).with_config(&self.config)
    }
}
