//! Progress reporting for long-running analyses.
//!
//! Progress follows a small state machine:
//!
//! ```text
//! Unstarted ──setup_known_steps(n)──┐
//!           ──setup_unknown_steps()─┴─> Stepping ──finish()──> Finished
//!                                        │    ^
//!                                        └step┘
//! ```
//!
//! - `step()` is only valid while stepping
//! - `finish()` is idempotent and harmless before setup
//! - A finished tracker may be set up again for the next run
//!
//! Cancellation is not part of progress; see [`crate::CancellationToken`].

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use crate::error::{Error, Result};

/// Sink for progress updates from an analysis.
///
/// Implementations must be `Sync`: parallel aggregation steps progress from
/// worker threads, and hosts typically read it from a UI thread.
pub trait Progress: Sync {
    /// Start a run with a known number of steps.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidProgressState` if a run is already in progress.
    fn setup_known_steps(&self, total: u64) -> Result<()>;

    /// Start a run whose length is not known ahead of time.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidProgressState` if a run is already in progress.
    fn setup_unknown_steps(&self) -> Result<()>;

    /// Record one completed step.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidProgressState` unless a run is in progress.
    fn step(&self) -> Result<()>;

    /// End the current run and release tracking state.
    fn finish(&self);
}

/// Progress sink that ignores every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn setup_known_steps(&self, _total: u64) -> Result<()> {
        Ok(())
    }

    fn setup_unknown_steps(&self) -> Result<()> {
        Ok(())
    }

    fn step(&self) -> Result<()> {
        Ok(())
    }

    fn finish(&self) {}
}

/// Lifecycle state of a [`ProgressTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    /// No run has been set up.
    Unstarted,
    /// A run is in progress.
    Stepping,
    /// The last run has finished.
    Finished,
}

impl ProgressState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Unstarted => "unstarted",
            Self::Stepping => "stepping",
            Self::Finished => "finished",
        }
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            STATE_STEPPING => Self::Stepping,
            STATE_FINISHED => Self::Finished,
            _ => Self::Unstarted,
        }
    }
}

const STATE_UNSTARTED: u8 = 0;
const STATE_STEPPING: u8 = 1;
const STATE_FINISHED: u8 = 2;

const UNKNOWN_TOTAL: u64 = u64::MAX;

/// Point-in-time view of a tracker, safe to take from any thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Lifecycle state.
    pub state: ProgressState,
    /// Steps recorded in the current (or last) run.
    pub steps_done: u64,
    /// Expected steps, or `None` for an unknown-length run.
    pub total: Option<u64>,
}

impl ProgressSnapshot {
    /// Completed fraction in `0.0..=1.0`, if the run has a known total.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.steps_done as f64 / total as f64).min(1.0)),
            None => None,
        }
    }
}

/// Thread-safe progress tracker.
///
/// A worker steps it while any other thread takes [`snapshot`](Self::snapshot)s.
#[derive(Debug)]
pub struct ProgressTracker {
    state: AtomicU8,
    steps_done: AtomicU64,
    total: AtomicU64,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    /// Create an unstarted tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(STATE_UNSTARTED),
            steps_done: AtomicU64::new(0),
            total: AtomicU64::new(UNKNOWN_TOTAL),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ProgressState {
        ProgressState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Read the tracker's current counters.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.state();
        let total = self.total.load(Ordering::Acquire);
        ProgressSnapshot {
            state,
            steps_done: self.steps_done.load(Ordering::Acquire),
            total: (total != UNKNOWN_TOTAL).then_some(total),
        }
    }

    fn start(&self, total: u64) -> Result<()> {
        let current = self.state.load(Ordering::Acquire);
        if current == STATE_STEPPING {
            return Err(self.setup_rejected());
        }
        // counters first: a reader that sees Stepping must see this run's counters
        self.steps_done.store(0, Ordering::Release);
        self.total.store(total, Ordering::Release);
        self.state
            .compare_exchange(current, STATE_STEPPING, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| self.setup_rejected())?;
        Ok(())
    }

    fn setup_rejected(&self) -> Error {
        Error::InvalidProgressState {
            operation: "setup",
            state: self.state().as_str(),
        }
    }
}

impl Progress for ProgressTracker {
    fn setup_known_steps(&self, total: u64) -> Result<()> {
        // u64::MAX is reserved for "unknown"; nobody has that many instances
        self.start(total.min(UNKNOWN_TOTAL - 1))
    }

    fn setup_unknown_steps(&self) -> Result<()> {
        self.start(UNKNOWN_TOTAL)
    }

    fn step(&self) -> Result<()> {
        let state = self.state();
        if state != ProgressState::Stepping {
            return Err(Error::InvalidProgressState {
                operation: "step",
                state: state.as_str(),
            });
        }
        self.steps_done.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn finish(&self) {
        let _ = self.state.compare_exchange(
            STATE_STEPPING,
            STATE_FINISHED,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

/// Scoped run on a [`Progress`] sink: finishes the run when dropped, whether the
/// analysis completed, failed, or was interrupted.
pub(crate) struct ProgressRun<'a> {
    progress: &'a dyn Progress,
}

impl<'a> ProgressRun<'a> {
    pub(crate) fn known(progress: &'a dyn Progress, total: usize) -> Result<Self> {
        progress.setup_known_steps(u64::try_from(total).unwrap_or(u64::MAX))?;
        Ok(Self { progress })
    }

    pub(crate) fn unknown(progress: &'a dyn Progress) -> Result<Self> {
        progress.setup_unknown_steps()?;
        Ok(Self { progress })
    }

    pub(crate) fn step(&self) -> Result<()> {
        self.progress.step()
    }
}

impl Drop for ProgressRun<'_> {
    fn drop(&mut self) {
        self.progress.finish();
    }
}
