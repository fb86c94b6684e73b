use crate::approach::Approach;
use crate::config::SimulationConfig;
use crate::error::{SimError, SimResult};
use crate::intersection::Intersection;
use crate::observer::{VehicleId, VehicleObserver};
use crate::statistics::StatisticsTracker;
use crate::sync::cancel::Interrupt;
use crate::sync::{lock, CancelToken};
use crate::vehicle::{Vehicle, VehicleOutcome};
use rand::Rng;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub(crate) type VehicleTask = JoinHandle<SimResult<VehicleOutcome>>;

/// Counts vehicle tasks that have terminated, whatever the outcome.
pub(crate) struct Completion {
    expected: u64,
    done: Mutex<u64>,
    changed: Condvar,
}

impl Completion {
    pub(crate) fn new(expected: u64) -> Self {
        Completion {
            expected,
            done: Mutex::new(0),
            changed: Condvar::new(),
        }
    }

    fn vehicle_done(&self) {
        let mut done = lock(&self.done);
        *done += 1;
        self.changed.notify_all();
    }

    pub(crate) fn done(&self) -> u64 {
        *lock(&self.done)
    }

    /// Returns true once every expected vehicle terminated. Returns false on
    /// timeout, or as soon as `cancel` fires with vehicles still outstanding.
    /// The caller must `watch` this with `cancel` for the early return.
    pub(crate) fn wait(&self, timeout: Duration, cancel: &CancelToken) -> bool {
        let deadline = Instant::now() + timeout;
        let mut done = lock(&self.done);
        while *done < self.expected {
            if cancel.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (next, _) = self
                .changed
                .wait_timeout(done, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            done = next;
        }
        true
    }
}

impl Interrupt for Completion {
    fn interrupt(&self) {
        let _done = lock(&self.done);
        self.changed.notify_all();
    }
}

// Counts the vehicle as done even if its task panics.
struct CompletionGuard(Arc<Completion>);

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.0.vehicle_done();
    }
}

/// Creates vehicles one A then one B per cycle, `spawn_interval` apart.
pub(crate) struct VehicleSpawner {
    config: SimulationConfig,
    intersection: Arc<Intersection>,
    statistics: Arc<StatisticsTracker>,
    observer: Arc<dyn VehicleObserver>,
    tasks: Arc<Mutex<Vec<VehicleTask>>>,
    completion: Arc<Completion>,
    next_id: VehicleId,
}

impl VehicleSpawner {
    pub(crate) fn new(
        config: SimulationConfig,
        intersection: Arc<Intersection>,
        statistics: Arc<StatisticsTracker>,
        observer: Arc<dyn VehicleObserver>,
        tasks: Arc<Mutex<Vec<VehicleTask>>>,
        completion: Arc<Completion>,
    ) -> Self {
        Self {
            config,
            intersection,
            statistics,
            observer,
            tasks,
            completion,
            next_id: 0,
        }
    }

    /// Returns the number of vehicles spawned before finishing or being cancelled.
    pub(crate) fn run(&mut self, cancel: &CancelToken) -> SimResult<u64> {
        let mut rng = rand::thread_rng();

        for cycle in 0..self.config.vehicle_count_per_approach {
            if cycle > 0 {
                let gap = self.next_gap(&mut rng);
                if cancel.sleep(gap).is_err() {
                    break;
                }
            }
            for approach in Approach::ALL {
                if cancel.is_cancelled() {
                    break;
                }
                self.spawn_vehicle(approach, cancel)?;
            }
        }

        info!(spawned = self.next_id, "vehicle spawner finished");
        Ok(self.next_id)
    }

    fn next_gap(&self, rng: &mut impl Rng) -> Duration {
        let jitter = if self.config.spawn_jitter_ms > 0 {
            rng.gen_range(0..=self.config.spawn_jitter_ms)
        } else {
            0
        };
        Duration::from_millis(self.config.spawn_interval_ms.saturating_add(jitter))
    }

    fn spawn_vehicle(&mut self, approach: Approach, cancel: &CancelToken) -> SimResult<()> {
        let id = self.next_id;
        let mut vehicle = Vehicle::new(
            id,
            approach,
            self.config.crossing_duration(),
            self.intersection.clone(),
            self.statistics.clone(),
            self.observer.clone(),
        );

        let cancel = cancel.clone();
        let guard = CompletionGuard(self.completion.clone());
        let task = thread::Builder::new()
            .name(format!("vehicle-{}-{}", approach, id))
            .spawn(move || {
                let _guard = guard;
                cancel.run_or_cancel(|| vehicle.run(&cancel))
            })
            .map_err(|e| SimError::Internal(format!("failed to spawn vehicle {}: {}", id, e)))?;

        self.next_id += 1;
        lock(&self.tasks).push(task);
        debug!(vehicle = id, %approach, "vehicle spawned");
        Ok(())
    }
}
