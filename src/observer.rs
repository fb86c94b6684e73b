//! Lifecycle hooks for code that watches vehicles without owning them.
//!
//! The rendering collaborator and the integration tests both implement
//! [`VehicleObserver`]; the core only ever calls it.

use crate::approach::Approach;
use serde::Serialize;
use std::time::Duration;

pub type VehicleId = u64;

/// Stages a vehicle moves through, strictly in declaration order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Stage {
    Created,
    WaitingLane,
    WaitingLight,
    Crossing,
    Finished,
}

/// Which of its two semaphores a vehicle touched.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum PermitKind {
    Lane,
    Light,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum PermitEvent {
    Acquired(PermitKind),
    /// Reported immediately before the permit goes back to its semaphore.
    Releasing(PermitKind),
}

/// Callbacks invoked from vehicle tasks. All methods default to no-ops and
/// may be called concurrently from many threads.
pub trait VehicleObserver: Send + Sync {
    fn stage_changed(&self, _vehicle: VehicleId, _approach: Approach, _stage: Stage) {}

    fn permit_changed(&self, _vehicle: VehicleId, _approach: Approach, _event: PermitEvent) {}

    fn crossed(&self, _vehicle: VehicleId, _approach: Approach, _wait: Duration) {}

    /// The vehicle stopped early because the simulation shut down.
    fn cancelled(&self, _vehicle: VehicleId, _approach: Approach, _stage: Stage) {}
}

/// A [`VehicleObserver`] that ignores everything.
pub struct NoopObserver;

impl VehicleObserver for NoopObserver {}
