// src/vehicle.rs - per-vehicle control routine
use crate::approach::Approach;
use crate::error::{SimError, SimResult};
use crate::intersection::Intersection;
use crate::observer::{PermitEvent, PermitKind, Stage, VehicleId, VehicleObserver};
use crate::statistics::StatisticsTracker;
use crate::sync::{CancelToken, Permit};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How a vehicle task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleOutcome {
    Crossed { wait: Duration },
    /// Shutdown interrupted the vehicle while it was in `stage`.
    Cancelled { stage: Stage },
}

/// Permits this vehicle currently owns. Only these are released on cancellation.
#[derive(Default)]
struct HeldPermits {
    lane: Option<Permit>,
    light: Option<Permit>,
}

impl HeldPermits {
    fn count(&self) -> usize {
        self.lane.is_some() as usize + self.light.is_some() as usize
    }
}

pub struct Vehicle {
    pub id: VehicleId,
    pub approach: Approach,
    pub stage: Stage,
    pub wait_start: Instant,
    finished: bool,
    crossing_duration: Duration,
    intersection: Arc<Intersection>,
    statistics: Arc<StatisticsTracker>,
    observer: Arc<dyn VehicleObserver>,
}

impl Vehicle {
    pub fn new(
        id: VehicleId,
        approach: Approach,
        crossing_duration: Duration,
        intersection: Arc<Intersection>,
        statistics: Arc<StatisticsTracker>,
        observer: Arc<dyn VehicleObserver>,
    ) -> Self {
        Vehicle {
            id,
            approach,
            stage: Stage::Created,
            wait_start: Instant::now(),
            finished: false,
            crossing_duration,
            intersection,
            statistics,
            observer,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Runs the full lifecycle. Cancellation is not an error: the vehicle
    /// returns whatever permits it holds and reports `Cancelled`.
    pub fn run(&mut self, cancel: &CancelToken) -> SimResult<VehicleOutcome> {
        self.statistics.vehicle_started(self.approach);
        self.observer.stage_changed(self.id, self.approach, self.stage);

        let mut held = HeldPermits::default();
        match self.traverse(&mut held, cancel) {
            Ok(wait) => Ok(VehicleOutcome::Crossed { wait }),
            Err(SimError::Cancelled) => {
                if held.count() > 0 {
                    warn!(
                        vehicle = self.id,
                        approach = %self.approach,
                        stage = ?self.stage,
                        held = held.count(),
                        "cancelled while holding permits; releasing them"
                    );
                }
                self.release_held(&mut held);
                self.observer.cancelled(self.id, self.approach, self.stage);
                Ok(VehicleOutcome::Cancelled { stage: self.stage })
            }
            Err(err) => {
                self.release_held(&mut held);
                Err(err)
            }
        }
    }

    fn traverse(&mut self, held: &mut HeldPermits, cancel: &CancelToken) -> SimResult<Duration> {
        let lane = self.intersection.lane(self.approach).clone();
        let light = self.intersection.light(self.approach).clone();

        self.advance(Stage::WaitingLane)?;
        held.lane = Some(lane.acquire_permit(cancel)?);
        self.report_permit(PermitEvent::Acquired(PermitKind::Lane));

        self.advance(Stage::WaitingLight)?;
        held.light = Some(light.acquire_permit(cancel)?);
        self.report_permit(PermitEvent::Acquired(PermitKind::Light));

        let wait = self.wait_start.elapsed();
        self.advance(Stage::Crossing)?;
        cancel.sleep(self.crossing_duration)?;

        self.release_light(held);
        self.release_lane(held);

        let wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
        self.statistics.vehicle_crossed(self.approach, wait_ms);
        self.observer.crossed(self.id, self.approach, wait);
        debug!(vehicle = self.id, approach = %self.approach, wait_ms, "crossed");

        self.advance(Stage::Finished)?;
        self.finished = true;
        Ok(wait)
    }

    // Light before lane, mirroring the acquisition order.
    fn release_held(&self, held: &mut HeldPermits) {
        self.release_light(held);
        self.release_lane(held);
    }

    fn release_light(&self, held: &mut HeldPermits) {
        if let Some(permit) = held.light.take() {
            self.report_permit(PermitEvent::Releasing(PermitKind::Light));
            permit.release();
        }
    }

    fn release_lane(&self, held: &mut HeldPermits) {
        if let Some(permit) = held.lane.take() {
            self.report_permit(PermitEvent::Releasing(PermitKind::Lane));
            permit.release();
        }
    }

    fn report_permit(&self, event: PermitEvent) {
        self.observer.permit_changed(self.id, self.approach, event);
    }

    fn advance(&mut self, next: Stage) -> SimResult<()> {
        if next <= self.stage {
            return Err(SimError::Internal(format!(
                "vehicle {} cannot move from {:?} back to {:?}",
                self.id, self.stage, next
            )));
        }
        self.stage = next;
        self.observer.stage_changed(self.id, self.approach, next);
        Ok(())
    }
}
