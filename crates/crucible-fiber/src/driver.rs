//! Drivers that stand in for a host idle-time service.
//!
//! Both grant slices of [`EngineConfig::slice_budget`](crate::EngineConfig)
//! until nothing is pending. The async driver yields to the tokio scheduler
//! between slices, so it must run on a single-threaded runtime or `LocalSet`
//! alongside the rest of the host's work.

use crate::commit::CommitSummary;
use crate::error::Result;
use crate::host::HostAdapter;
use crate::scheduler::{Deadline, IdleScheduler, InstantDeadline};
use crate::work_loop::{Engine, SliceOutcome};
use tracing::debug;

/// What a driver run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriveReport {
    pub slices: usize,
    pub units: usize,
    pub commits: Vec<CommitSummary>,
}

impl DriveReport {
    fn record(&mut self, outcome: SliceOutcome) {
        match outcome {
            SliceOutcome::Idle => {}
            SliceOutcome::Yielded { units } => {
                self.slices += 1;
                self.units += units;
            }
            SliceOutcome::Committed { units, summary } => {
                self.slices += 1;
                self.units += units;
                self.commits.push(summary);
            }
        }
    }
}

/// Run slices produced by `deadline` until the engine is idle.
pub fn run_with<H, S, D>(
    engine: &mut Engine<H, S>,
    mut deadline: impl FnMut() -> D,
) -> Result<DriveReport>
where
    H: HostAdapter,
    S: IdleScheduler,
    D: Deadline,
{
    let mut report = DriveReport::default();
    while engine.has_pending_work() {
        let outcome = engine.run_slice(&deadline())?;
        report.record(outcome);
    }
    debug!(
        "drive finished: {} slices, {} units, {} commits",
        report.slices,
        report.units,
        report.commits.len()
    );
    Ok(report)
}

/// Run wall-clock slices until the engine is idle.
pub fn run_to_completion<H: HostAdapter, S: IdleScheduler>(
    engine: &mut Engine<H, S>,
) -> Result<DriveReport> {
    let budget = engine.config().slice_budget();
    run_with(engine, || InstantDeadline::new(budget))
}

/// Cooperative async driver: one slice, then `yield_now`, until idle.
pub async fn drive_local<H: HostAdapter, S: IdleScheduler>(
    engine: &mut Engine<H, S>,
) -> Result<DriveReport> {
    let budget = engine.config().slice_budget();
    let mut report = DriveReport::default();
    while engine.has_pending_work() {
        let outcome = engine.run_slice(&InstantDeadline::new(budget))?;
        report.record(outcome);
        tokio::task::yield_now().await;
    }
    Ok(report)
}
