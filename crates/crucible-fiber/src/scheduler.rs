//! Capabilities of the idle-time service that grants the work loop its slices.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Remaining budget of the slice currently being executed.
pub trait Deadline {
    fn time_remaining(&self) -> Duration;
}

/// External service that calls the engine back when the host is idle.
///
/// The engine calls [`request_slice`](IdleScheduler::request_slice) whenever
/// it has pending work; the service later invokes
/// [`Engine::run_slice`](crate::Engine::run_slice) with a fresh [`Deadline`].
pub trait IdleScheduler {
    fn request_slice(&mut self);
}

/// Wall-clock budget starting at construction.
#[derive(Debug, Clone, Copy)]
pub struct InstantDeadline {
    ends_at: Instant,
}

impl InstantDeadline {
    pub fn new(budget: Duration) -> Self {
        Self {
            ends_at: Instant::now() + budget,
        }
    }
}

impl Deadline for InstantDeadline {
    fn time_remaining(&self) -> Duration {
        self.ends_at.saturating_duration_since(Instant::now())
    }
}

/// A slice that is always over. The loop still performs one unit per slice.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpiredDeadline;

impl Deadline for ExpiredDeadline {
    fn time_remaining(&self) -> Duration {
        Duration::ZERO
    }
}

/// A slice that never runs out.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnboundedDeadline;

impl Deadline for UnboundedDeadline {
    fn time_remaining(&self) -> Duration {
        Duration::MAX
    }
}

/// Reports plenty of time for the first `units` checks, then expires.
#[derive(Debug)]
pub struct CountdownDeadline {
    remaining: Cell<usize>,
}

impl CountdownDeadline {
    pub fn new(units: usize) -> Self {
        Self {
            remaining: Cell::new(units),
        }
    }
}

impl Deadline for CountdownDeadline {
    fn time_remaining(&self) -> Duration {
        match self.remaining.get() {
            0 => Duration::ZERO,
            n => {
                self.remaining.set(n - 1);
                Duration::MAX
            }
        }
    }
}

/// Idle service that only counts requests; the caller drives slices.
#[derive(Debug, Default)]
pub struct ManualIdle {
    requested: usize,
    pending: bool,
}

impl ManualIdle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of slice requests seen.
    pub fn requests(&self) -> usize {
        self.requested
    }

    /// Consume the outstanding request, if any.
    pub fn take_request(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}

impl IdleScheduler for ManualIdle {
    fn request_slice(&mut self) {
        self.requested += 1;
        self.pending = true;
    }
}
