//! Compute-cycle state machine.
//!
//! ```text
//! Idle ──try_begin──▶ Computing ──guard dropped──▶ Idle
//!   ▲                     │
//!   └── trigger while Computing: coalesced, state unchanged
//! ```
//!
//! At most one computation is in progress per analyzer. Triggers that arrive
//! meanwhile are dropped, never queued.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerState {
    Idle = 0,
    Computing = 1,
}

#[derive(Debug)]
pub struct TickGate {
    state: AtomicU8,
}

impl Default for TickGate {
    fn default() -> Self {
        Self::new()
    }
}

impl TickGate {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(SchedulerState::Idle as u8),
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.state.load(Ordering::Acquire) == SchedulerState::Computing as u8 {
            SchedulerState::Computing
        } else {
            SchedulerState::Idle
        }
    }

    /// Moves `Idle → Computing`, or returns `None` if a computation is running.
    pub fn try_begin(&self) -> Option<ComputeGuard<'_>> {
        self.state
            .compare_exchange(
                SchedulerState::Idle as u8,
                SchedulerState::Computing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()
            .map(|_| ComputeGuard { gate: self })
    }
}

/// Holds the gate in `Computing`; dropping it returns to `Idle`.
#[derive(Debug)]
pub struct ComputeGuard<'a> {
    gate: &'a TickGate,
}

impl Drop for ComputeGuard<'_> {
    fn drop(&mut self) {
        self.gate
            .state
            .store(SchedulerState::Idle as u8, Ordering::Release);
    }
}
