//! Grouping of many instances by the GC root they ultimately reach.
//!
//! Each instance's root is resolved by following the nearest-root oracle until
//! it settles on a fixed point (a root) or runs out (unreachable). Instances
//! resolving to the same root share a [`RootGroup`].
//!
//! ## Memory pressure
//!
//! Group bookkeeping grows with the input, which may hold millions of
//! instances. Every allocation goes through `try_reserve`; a failed reservation
//! drops all partial groups and returns `Error::OutOfMemory` instead of aborting
//! the process.
//!
//! ## Parallel resolution
//!
//! Root resolution is independent per instance, so [`RootAggregator::aggregate_parallel`]
//! resolves on the rayon pool and then inserts sequentially in input order. The
//! resulting groups are identical to the sequential ones.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::cancel::CancellationToken;
use crate::config::DEFAULT_MAX_ROOT_DISTANCE;
use crate::error::{Error, Inconsistency, Result};
use crate::heap::HeapGraph;
use crate::progress::{Progress, ProgressRun};
use crate::types::{InstanceId, RootKey};

/// Instances sharing one ultimate GC root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootGroup {
    key: RootKey,
    members: Vec<InstanceId>,
}

impl RootGroup {
    fn new(key: RootKey) -> Self {
        Self {
            key,
            members: Vec::new(),
        }
    }

    /// The root this group is keyed by.
    #[must_use]
    pub fn key(&self) -> RootKey {
        self.key
    }

    /// The root instance, or `None` for the unreachable bucket.
    #[must_use]
    pub fn root(&self) -> Option<InstanceId> {
        self.key.instance()
    }

    /// Members in the order they were aggregated.
    #[must_use]
    pub fn members(&self) -> &[InstanceId] {
        &self.members
    }

    /// Number of members.
    #[must_use]
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if members have a path worth expanding.
    ///
    /// Members of the unreachable bucket have no path to any root.
    #[must_use]
    pub fn members_expandable(&self) -> bool {
        self.key != RootKey::Unreachable
    }
}

/// The complete partition produced by an aggregation.
///
/// Groups are kept in an arena in first-seen order, indexed by root key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RootGroups {
    groups: Vec<RootGroup>,
    #[serde(skip)]
    index: HashMap<RootKey, usize>,
}

impl RootGroups {
    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` if nothing was aggregated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The group for `key`, if any instance resolved to it.
    #[must_use]
    pub fn get(&self, key: RootKey) -> Option<&RootGroup> {
        self.index.get(&key).map(|&slot| &self.groups[slot])
    }

    /// The group for root instance `root`.
    #[must_use]
    pub fn for_root(&self, root: InstanceId) -> Option<&RootGroup> {
        self.get(RootKey::Root(root))
    }

    /// Groups in first-seen order.
    pub fn iter(&self) -> std::slice::Iter<'_, RootGroup> {
        self.groups.iter()
    }

    /// Groups in first-seen order, as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[RootGroup] {
        &self.groups
    }

    /// The only group, if there is exactly one.
    #[must_use]
    pub fn single(&self) -> Option<&RootGroup> {
        match self.groups.as_slice() {
            [group] => Some(group),
            _ => None,
        }
    }

    /// Total number of aggregated instances across all groups.
    #[must_use]
    pub fn total_members(&self) -> usize {
        self.groups.iter().map(RootGroup::count).sum()
    }

    /// Consume the partition, returning groups in first-seen order.
    #[must_use]
    pub fn into_groups(self) -> Vec<RootGroup> {
        self.groups
    }
}

impl<'a> IntoIterator for &'a RootGroups {
    type Item = &'a RootGroup;
    type IntoIter = std::slice::Iter<'a, RootGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

/// Incremental group construction with fallible allocation.
#[derive(Default)]
struct GroupsBuilder {
    groups: RootGroups,
}

impl GroupsBuilder {
    fn insert(&mut self, key: RootKey, instance: InstanceId) -> Result<()> {
        let slot = match self.groups.index.get(&key) {
            Some(&slot) => slot,
            None => self.open_group(key)?,
        };

        let members = &mut self.groups.groups[slot].members;
        members
            .try_reserve(1)
            .map_err(|_| Error::out_of_memory("recording root group members"))?;
        members.push(instance);
        Ok(())
    }

    fn open_group(&mut self, key: RootKey) -> Result<usize> {
        let groups = &mut self.groups;
        groups
            .groups
            .try_reserve(1)
            .map_err(|_| Error::out_of_memory("creating a root group"))?;
        groups
            .index
            .try_reserve(1)
            .map_err(|_| Error::out_of_memory("indexing root groups"))?;

        let slot = groups.groups.len();
        groups.groups.push(RootGroup::new(key));
        groups.index.insert(key, slot);
        trace!(root = %key, slot, "opened root group");
        Ok(slot)
    }

    fn finish(self) -> RootGroups {
        self.groups
    }
}

/// Partitions instances by the GC root they ultimately reach.
#[derive(Debug)]
pub struct RootAggregator<'h, H: HeapGraph + ?Sized> {
    heap: &'h H,
    max_root_distance: usize,
}

impl<'h, H: HeapGraph + ?Sized> RootAggregator<'h, H> {
    /// Create an aggregator over `heap` with the default hop budget.
    pub fn new(heap: &'h H) -> Self {
        Self {
            heap,
            max_root_distance: DEFAULT_MAX_ROOT_DISTANCE,
        }
    }

    /// Set the hop budget for resolving a single instance's root.
    #[must_use]
    pub fn with_max_root_distance(mut self, limit: usize) -> Self {
        self.max_root_distance = limit;
        self
    }

    /// Follow the oracle from `instance` until it settles.
    ///
    /// # Errors
    ///
    /// - `Error::Interrupted` if `cancel` is triggered mid-resolution
    /// - `Error::Inconsistent` if the hop budget is exhausted
    pub fn resolve_root(&self, instance: InstanceId, cancel: &CancellationToken) -> Result<RootKey> {
        let mut current = instance;
        let mut hops = 0usize;

        loop {
            match self.heap.nearest_root_pointer(current) {
                None => return Ok(RootKey::Unreachable),
                Some(next) if next == current => return Ok(RootKey::Root(current)),
                Some(next) => {
                    hops += 1;
                    if hops > self.max_root_distance {
                        return Err(Inconsistency::ChainTooLong {
                            start: instance,
                            limit: self.max_root_distance,
                        }
                        .into());
                    }
                    cancel.check()?;
                    current = next;
                }
            }
        }
    }

    /// Group `instances` by their resolved root, one at a time.
    ///
    /// `expected_count` sizes the known-length progress run; one step is reported
    /// per instance.
    ///
    /// # Errors
    ///
    /// - `Error::Interrupted` if `cancel` is triggered; no partial groups escape
    /// - `Error::OutOfMemory` if group bookkeeping can't be allocated
    /// - `Error::Inconsistent` if an instance's root can't be resolved
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
        let _span = tracing::debug_span!("aggregate", expected_count).entered();
        let run = ProgressRun::known(progress, expected_count)?;
        let mut builder = GroupsBuilder::default();

        for instance in instances {
            cancel.check()?;
            let key = self.resolve_root(instance, cancel)?;
            builder.insert(key, instance).inspect_err(log_oom)?;
            run.step()?;
        }
        cancel.check()?;

        let groups = builder.finish();
        debug!(
            groups = groups.len(),
            instances = groups.total_members(),
            "aggregated instances by GC root"
        );
        Ok(groups)
    }

    /// Group `instances` by their resolved root, resolving on the rayon pool.
    ///
    /// Produces exactly the groups [`aggregate`](Self::aggregate) would, in the
    /// same order. Progress steps arrive from worker threads.
    ///
    /// # Errors
    ///
    /// Same as [`aggregate`](Self::aggregate).
    pub fn aggregate_parallel(
        &self,
        instances: &[InstanceId],
        progress: &dyn Progress,
        cancel: &CancellationToken,
    ) -> Result<RootGroups> {
        let _span = tracing::debug_span!("aggregate_parallel", count = instances.len()).entered();
        let run = ProgressRun::known(progress, instances.len())?;

        let mut keys: Vec<Result<RootKey>> = Vec::new();
        keys.try_reserve_exact(instances.len())
            .map_err(|_| Error::out_of_memory("resolving GC roots"))
            .inspect_err(log_oom)?;

        instances
            .par_iter()
            .map(|&instance| {
                cancel.check()?;
                let key = self.resolve_root(instance, cancel)?;
                run.step()?;
                Ok(key)
            })
            .collect_into_vec(&mut keys);
        cancel.check()?;

        let mut builder = GroupsBuilder::default();
        for (&instance, key) in instances.iter().zip(keys) {
            builder.insert(key?, instance).inspect_err(log_oom)?;
        }

        let groups = builder.finish();
        debug!(
            groups = groups.len(),
            instances = groups.total_members(),
            "aggregated instances by GC root"
        );
        Ok(groups)
    }
}

fn log_oom(err: &Error) {
    if err.is_out_of_memory() {
        warn!(error = %err, "aggregation abandoned, partial groups discarded");
    }
}
