//! Path from a single instance to its nearest GC root.
//!
//! The walk follows the nearest-root oracle one hop at a time. For each hop it
//! scans the current instance's references for the one pointing at the next
//! hop; that reference's label becomes the next chain step.
//!
//! ```text
//!   start ──f1──> b ──[3]──> c ──f2──> root
//!   oracle: start→b, b→c, c→root, root→root
//! ```
//!
//! Cost is O(chain length × fan-out of each instance on the chain).

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::config::MissingEdgePolicy;
use crate::error::{Error, Inconsistency, Result};
use crate::heap::HeapGraph;
use crate::progress::{Progress, ProgressRun};
use crate::types::{ChainEdge, InstanceId, PathOutcome, RootChain, SkippedHop};

/// Builds the reference chain from one instance to its nearest GC root.
#[derive(Debug)]
pub struct PathBuilder<'h, H: HeapGraph + ?Sized> {
    heap: &'h H,
    missing_edge: MissingEdgePolicy,
}

impl<'h, H: HeapGraph + ?Sized> PathBuilder<'h, H> {
    /// Create a builder over `heap` that skips hops missing from the heap.
    pub fn new(heap: &'h H) -> Self {
        Self {
            heap,
            missing_edge: MissingEdgePolicy::default(),
        }
    }

    /// Choose how hops without a matching reference are handled.
    #[must_use]
    pub fn with_missing_edge(mut self, policy: MissingEdgePolicy) -> Self {
        self.missing_edge = policy;
        self
    }

    /// Build the path from `instance` to its nearest GC root.
    ///
    /// Each hop reports one step on an unknown-length progress run. The run is
    /// finished on every exit path.
    ///
    /// # Errors
    ///
    /// - `Error::Interrupted` if `cancel` is triggered during the walk
    /// - `Error::Inconsistent` if the oracle loops or dead-ends, or if a hop has
    ///   no matching reference under [`MissingEdgePolicy::Fail`]
    pub fn build_path(
        &self,
        instance: InstanceId,
        progress: &dyn Progress,
        cancel: &CancellationToken,
    ) -> Result<PathOutcome> {
        let Some(mut next) = self.heap.nearest_root_pointer(instance) else {
            return Ok(PathOutcome::NoRoot);
        };
        if next == instance {
            return Ok(PathOutcome::IsRoot);
        }

        let _span = tracing::debug_span!("build_path", %instance).entered();
        let run = ProgressRun::unknown(progress)?;

        let mut current = instance;
        let mut visited = HashSet::from([instance]);
        let mut edges = Vec::new();
        let mut skipped = Vec::new();

        while current != next {
            cancel.check()?;

            match self.heap.reference_to(current, next) {
                Some(edge) => edges.push(ChainEdge {
                    referrer: current,
                    referent: next,
                    edge,
                }),
                None => self.missing_hop(current, next, &mut skipped)?,
            }

            if !visited.insert(next) {
                return Err(Inconsistency::OracleCycle {
                    start: instance,
                    revisited: next,
                }
                .into());
            }

            current = next;
            next = self.heap.nearest_root_pointer(current).ok_or(
                Inconsistency::DanglingPointer {
                    start: instance,
                    instance: current,
                },
            )?;
            run.step()?;
        }
        cancel.check()?;

        debug!(
            root = %current,
            steps = edges.len(),
            skipped = skipped.len(),
            "path to GC root built"
        );
        Ok(PathOutcome::Chain(RootChain::new(
            instance, current, edges, skipped,
        )))
    }

    fn missing_hop(
        &self,
        from: InstanceId,
        to: InstanceId,
        skipped: &mut Vec<SkippedHop>,
    ) -> Result<()> {
        match self.missing_edge {
            MissingEdgePolicy::Fail => Err(Error::from(Inconsistency::MissingEdge {
                from,
                expected: to,
            })),
            MissingEdgePolicy::Skip => {
                warn!(%from, %to, "no reference matches nearest-root pointer, skipping hop");
                skipped.push(SkippedHop { from, to });
                Ok(())
            }
        }
    }
}
