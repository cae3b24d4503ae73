//! Integration tests for grouping instances by GC root.

mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{CancelAfter, fan_in, id, linear_chain, two_roots};
use rootward::{
    CancellationToken, EngineConfig, Error, HeapGraph, InstanceId, MemoryHeap, NoProgress,
    OUT_OF_MEMORY_LABEL, PathOutcome, ProgressState, ProgressTracker, Reference, Result,
    RootAggregator, RootAnalyzer, RootKey, RootsReport,
};
use rstest::rstest;

fn parallel_config() -> EngineConfig {
    EngineConfig {
        parallel_aggregation: true,
        ..EngineConfig::default()
    }
}

// ========== Grouping ==========

#[rstest]
#[case::sequential(EngineConfig::default())]
#[case::parallel(parallel_config())]
fn test_groups_instances_by_ultimate_root(#[case] config: EngineConfig) {
    let f = two_roots();
    let analyzer = RootAnalyzer::with_config(&f.heap, config).unwrap();

    let groups = analyzer
        .aggregate([f.x, f.y, f.z], 3, &NoProgress, &CancellationToken::new())
        .unwrap();

    assert_eq!(groups.len(), 2);
    assert_eq!(groups.for_root(f.r).unwrap().members(), &[f.x, f.y]);
    assert_eq!(groups.for_root(f.s).unwrap().members(), &[f.z]);
    assert_eq!(groups.total_members(), 3);
}

#[rstest]
#[case::sequential(EngineConfig::default())]
#[case::parallel(parallel_config())]
fn test_singleton_input_yields_one_group_of_one(#[case] config: EngineConfig) {
    let f = two_roots();
    let analyzer = RootAnalyzer::with_config(&f.heap, config).unwrap();

    let groups = analyzer
        .aggregate([f.z], 1, &NoProgress, &CancellationToken::new())
        .unwrap();

    assert_eq!(groups.len(), 1);
    let group = groups.single().expect("exactly one group");
    assert_eq!(group.root(), Some(f.s));
    assert_eq!(group.members(), &[f.z]);
}

#[test]
fn test_every_instance_lands_in_exactly_one_group() {
    let f = two_roots();
    let input = vec![f.u, f.x, f.r, f.z, f.y, f.s];
    let groups = RootAnalyzer::new(&f.heap)
        .aggregate(input.clone(), input.len(), &NoProgress, &CancellationToken::new())
        .unwrap();

    let mut seen = HashSet::new();
    for group in &groups {
        for &member in group.members() {
            assert!(seen.insert(member), "{member} appears twice");
        }
    }
    assert_eq!(seen, input.into_iter().collect::<HashSet<_>>());
}

#[test]
fn test_group_key_matches_each_members_path() {
    let f = two_roots();
    let analyzer = RootAnalyzer::new(&f.heap);
    let cancel = CancellationToken::new();
    let groups = analyzer
        .aggregate([f.x, f.y, f.z, f.u], 4, &NoProgress, &cancel)
        .unwrap();

    for group in &groups {
        for &member in group.members() {
            let outcome = analyzer.build_path(member, &NoProgress, &cancel).unwrap();
            let path_root = match outcome {
                PathOutcome::Chain(chain) => Some(chain.root()),
                PathOutcome::IsRoot => Some(member),
                PathOutcome::NoRoot => None,
            };
            assert_eq!(path_root, group.root());
        }
    }
}

#[test]
fn test_roots_group_under_themselves() {
    let f = two_roots();
    let groups = RootAnalyzer::new(&f.heap)
        .aggregate([f.r, f.x], 2, &NoProgress, &CancellationToken::new())
        .unwrap();

    let single = groups.single().expect("one group");
    assert_eq!(single.key(), RootKey::Root(f.r));
    assert_eq!(single.members(), &[f.r, f.x]);
}

#[test]
fn test_unreachable_instances_share_a_bucket() {
    let f = two_roots();
    let mut heap = f.heap.clone();
    heap.add_instance(id(900));

    let groups = RootAnalyzer::new(&heap)
        .aggregate([f.u, f.x, id(900)], 3, &NoProgress, &CancellationToken::new())
        .unwrap();

    let bucket = groups.get(RootKey::Unreachable).unwrap();
    assert_eq!(bucket.members(), &[f.u, id(900)]);
    assert_eq!(bucket.key().to_string(), "<no GC root>");
    assert!(!bucket.members_expandable());
}

#[test]
fn test_parallel_matches_sequential_on_wide_fan_in() {
    let (heap, leaves) = fan_in(5_000, 37);
    let aggregator = RootAggregator::new(&heap);
    let cancel = CancellationToken::new();

    let sequential = aggregator
        .aggregate(leaves.iter().copied(), leaves.len(), &NoProgress, &cancel)
        .unwrap();
    let parallel = aggregator
        .aggregate_parallel(&leaves, &NoProgress, &cancel)
        .unwrap();

    assert_eq!(sequential.len(), 37);
    assert_eq!(parallel, sequential);
}

// ========== Reports ==========

#[test]
fn test_empty_input_reports_no_root() {
    let f = two_roots();
    let report = RootAnalyzer::new(&f.heap)
        .analyze_instances(Vec::new(), 0, &NoProgress, &CancellationToken::new())
        .unwrap();
    assert_eq!(report, RootsReport::NoRoot);
}

#[test]
fn test_single_root_is_unwrapped() {
    let f = two_roots();
    let report = RootAnalyzer::new(&f.heap)
        .analyze_instances([f.x, f.y], 2, &NoProgress, &CancellationToken::new())
        .unwrap();

    let RootsReport::SingleGroup(group) = &report else {
        panic!("expected a single group, got {report:?}");
    };
    assert_eq!(group.root(), Some(f.r));
    assert_eq!(report.to_string(), format!("{} (2 instances)", f.r));
}

#[test]
fn test_many_roots_are_listed() {
    let f = two_roots();
    let report = RootAnalyzer::new(&f.heap)
        .analyze_instances([f.x, f.y, f.z, f.u], 4, &NoProgress, &CancellationToken::new())
        .unwrap();

    let RootsReport::Groups(groups) = &report else {
        panic!("expected groups, got {report:?}");
    };
    assert_eq!(groups.len(), 3);
    assert_eq!(report.to_string(), "3 GC roots (4 instances)");
}

#[test]
fn test_unallocatable_input_reports_out_of_memory() {
    let f = two_roots();
    let analyzer = RootAnalyzer::with_config(&f.heap, parallel_config()).unwrap();
    let cancel = CancellationToken::new();

    let err = analyzer
        .aggregate([f.x], usize::MAX, &NoProgress, &cancel)
        .unwrap_err();
    assert!(err.is_out_of_memory());
    assert_eq!(err.user_message(), OUT_OF_MEMORY_LABEL);

    let report = analyzer
        .analyze_instances([f.x], usize::MAX, &NoProgress, &cancel)
        .unwrap();
    assert_eq!(report, RootsReport::OutOfMemory);
    assert_eq!(report.to_string(), OUT_OF_MEMORY_LABEL);
}

#[test]
fn test_member_path_expands_group_members() {
    let f = two_roots();
    let analyzer = RootAnalyzer::new(&f.heap);
    let cancel = CancellationToken::new();
    let groups = analyzer
        .aggregate([f.x, f.u], 2, &NoProgress, &cancel)
        .unwrap();

    let rooted = groups.for_root(f.r).unwrap();
    let outcome = analyzer.member_path(rooted, 0, &NoProgress, &cancel).unwrap();
    assert_eq!(outcome.chain().unwrap().start(), f.x);

    let bucket = groups.get(RootKey::Unreachable).unwrap();
    assert_eq!(
        analyzer.member_path(bucket, 0, &NoProgress, &cancel).unwrap(),
        PathOutcome::NoRoot
    );

    let err = analyzer
        .member_path(rooted, 5, &NoProgress, &cancel)
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

// ========== Cancellation and Progress ==========

#[test]
fn test_cancel_after_some_instances_interrupts() {
    let (heap, leaves) = fan_in(50, 4);
    let cancel = CancellationToken::new();
    let progress = CancelAfter::new(cancel.clone(), 20);

    let err = RootAnalyzer::new(&heap)
        .aggregate(leaves.iter().copied(), leaves.len(), &progress, &cancel)
        .unwrap_err();

    assert!(err.is_interrupted());
    let snapshot = progress.snapshot();
    assert_eq!(snapshot.steps_done, 20);
    assert_eq!(snapshot.total, Some(50));
    assert_eq!(snapshot.state, ProgressState::Finished);
}

#[test]
fn test_cancel_during_parallel_run_interrupts() {
    let (heap, leaves) = fan_in(2_000, 8);
    let cancel = CancellationToken::new();
    let progress = CancelAfter::new(cancel.clone(), 100);
    let analyzer = RootAnalyzer::with_config(&heap, parallel_config()).unwrap();

    let err = analyzer
        .aggregate(leaves.iter().copied(), leaves.len(), &progress, &cancel)
        .unwrap_err();

    assert!(err.is_interrupted());
    assert_eq!(progress.snapshot().state, ProgressState::Finished);
}

#[test]
fn test_cancelled_report_is_an_error_not_a_result() {
    let f = two_roots();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = RootAnalyzer::new(&f.heap)
        .analyze_instances([f.x], 1, &NoProgress, &cancel)
        .unwrap_err();
    assert!(err.is_interrupted());
}

#[test]
fn test_progress_runs_to_known_total() {
    let (heap, leaves) = fan_in(64, 3);
    let tracker = ProgressTracker::new();
    RootAnalyzer::new(&heap)
        .aggregate(leaves.iter().copied(), leaves.len(), &tracker, &CancellationToken::new())
        .unwrap();

    let snapshot = tracker.snapshot();
    assert_eq!(snapshot.steps_done, 64);
    assert_eq!(snapshot.fraction(), Some(1.0));
    assert_eq!(snapshot.state, ProgressState::Finished);
}

#[test]
fn test_hop_budget_bounds_resolution() {
    let heap = linear_chain(40);
    let config = EngineConfig {
        max_root_distance: 10,
        ..EngineConfig::default()
    };
    let analyzer = RootAnalyzer::with_config(&heap, config).unwrap();
    let cancel = CancellationToken::new();

    assert!(analyzer.aggregate([id(35)], 1, &NoProgress, &cancel).is_ok());
    let err = analyzer
        .aggregate([id(1)], 1, &NoProgress, &cancel)
        .unwrap_err();
    assert!(err.is_inconsistency());
}

// ========== Lazy Oracles ==========

/// A heap whose root pointers must be prepared before each analysis.
struct LazyRoots {
    inner: MemoryHeap,
    prepared: AtomicUsize,
}

impl HeapGraph for LazyRoots {
    fn nearest_root_pointer(&self, instance: InstanceId) -> Option<InstanceId> {
        assert!(self.prepared.load(Ordering::SeqCst) > 0, "oracle used before prepare_roots");
        self.inner.nearest_root_pointer(instance)
    }

    fn outgoing_references(&self, instance: InstanceId) -> Vec<Reference> {
        self.inner.outgoing_references(instance)
    }

    fn prepare_roots(&self) -> Result<()> {
        self.prepared.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_roots_are_prepared_before_each_analysis() {
    let f = two_roots();
    let heap = LazyRoots {
        inner: f.heap,
        prepared: AtomicUsize::new(0),
    };
    let analyzer = RootAnalyzer::new(&heap);
    let cancel = CancellationToken::new();

    analyzer.build_path(f.x, &NoProgress, &cancel).unwrap();
    analyzer.aggregate([f.x, f.z], 2, &NoProgress, &cancel).unwrap();

    assert_eq!(heap.prepared.load(Ordering::SeqCst), 2);
}
