use super::spawner::{Completion, VehicleSpawner, VehicleTask};
use crate::config::SimulationConfig;
use crate::controller::{Controller, LightListeners, LightSignal, LightState};
use crate::error::{SimError, SimResult};
use crate::intersection::{Intersection, PermitCounts};
use crate::observer::VehicleObserver;
use crate::statistics::{StatisticsSnapshot, StatisticsTracker};
use crate::sync::cancel::Interrupt;
use crate::sync::{lock, CancelToken};
use crate::vehicle::VehicleOutcome;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{error, info};

/// What the rendering collaborator polls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationSnapshot {
    pub statistics: StatisticsSnapshot,
    pub light: LightState,
    pub light_flips: u64,
    pub ms_until_next_tick: u64,
    pub elapsed_ms: u64,
}

/// Summary of a completed shutdown. Repeated shutdowns return the same report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShutdownReport {
    pub vehicles_spawned: u64,
    pub vehicles_joined: u64,
    pub vehicles_crossed: u64,
    pub vehicles_cancelled: u64,
    pub light_flips: u64,
    pub errors: Vec<SimError>,
}

impl ShutdownReport {
    fn record(&mut self, err: SimError) {
        error!(%err, "task failed during simulation");
        self.errors.push(err);
    }
}

struct Workers {
    controller: JoinHandle<SimResult<u64>>,
    spawner: JoinHandle<SimResult<u64>>,
    vehicles: Arc<Mutex<Vec<VehicleTask>>>,
}

#[derive(Default)]
struct Lifecycle {
    workers: Option<Workers>,
    report: Option<ShutdownReport>,
}

pub struct SimulationHandle {
    config: SimulationConfig,
    intersection: Arc<Intersection>,
    statistics: Arc<StatisticsTracker>,
    signal: Arc<LightSignal>,
    listeners: Arc<LightListeners>,
    completion: Arc<Completion>,
    cancel: CancelToken,
    started_at: Instant,
    lifecycle: Mutex<Lifecycle>,
}

impl SimulationHandle {
    pub(crate) fn start(
        config: SimulationConfig,
        observer: Arc<dyn VehicleObserver>,
    ) -> SimResult<Self> {
        config.validate()?;

        let intersection = Arc::new(Intersection::new()?);
        let statistics = Arc::new(StatisticsTracker::new());
        let signal = Arc::new(LightSignal::new());
        let listeners = Arc::new(LightListeners::default());
        let expected = u64::from(config.vehicle_count_per_approach) * 2;
        let completion = Arc::new(Completion::new(expected));
        let vehicles = Arc::new(Mutex::new(Vec::new()));
        let cancel = CancelToken::new();
        let completion_wakeup: Arc<dyn Interrupt> = completion.clone();
        cancel.watch(completion_wakeup);

        let controller = {
            let mut controller = Controller::new(
                config.tick_interval(),
                intersection.clone(),
                signal.clone(),
                listeners.clone(),
            );
            let cancel = cancel.clone();
            thread::Builder::new()
                .name("light-controller".to_string())
                .spawn(move || cancel.run_or_cancel(|| controller.run(&cancel)))
                .map_err(|e| SimError::Internal(format!("failed to start controller: {}", e)))?
        };

        let mut spawner = VehicleSpawner::new(
            config.clone(),
            intersection.clone(),
            statistics.clone(),
            observer,
            vehicles.clone(),
            completion.clone(),
        );
        let spawner_cancel = cancel.clone();
        let spawner = match thread::Builder::new()
            .name("vehicle-spawner".to_string())
            .spawn(move || spawner_cancel.run_or_cancel(|| spawner.run(&spawner_cancel)))
        {
            Ok(handle) => handle,
            Err(e) => {
                cancel.cancel();
                let _ = controller.join();
                return Err(SimError::Internal(format!("failed to start spawner: {}", e)));
            }
        };

        info!(
            vehicles_per_approach = config.vehicle_count_per_approach,
            spawn_interval_ms = config.spawn_interval_ms,
            tick_interval_ms = config.tick_interval_ms,
            crossing_duration_ms = config.crossing_duration_ms,
            "simulation started"
        );

        Ok(SimulationHandle {
            config,
            intersection,
            statistics,
            signal,
            listeners,
            completion,
            cancel,
            started_at: Instant::now(),
            lifecycle: Mutex::new(Lifecycle {
                workers: Some(Workers {
                    controller,
                    spawner,
                    vehicles,
                }),
                report: None,
            }),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            statistics: self.statistics.snapshot(),
            light: self.signal.state(),
            light_flips: self.signal.flips(),
            ms_until_next_tick: self.signal.ms_until_next_tick(),
            elapsed_ms: u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn light_state(&self) -> LightState {
        self.signal.state()
    }

    pub fn statistics(&self) -> &StatisticsTracker {
        &self.statistics
    }

    pub fn permit_counts(&self) -> PermitCounts {
        self.intersection.permit_counts()
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Registers a best-effort callback fired after every light switch.
    pub fn on_light_change<F>(&self, callback: F)
    where
        F: Fn(LightState) + Send + Sync + 'static,
    {
        self.listeners.register(Box::new(callback));
    }

    /// Blocks until every configured vehicle task has ended and returns true.
    /// Returns false when `timeout` elapses, or early once the simulation is
    /// cancelled, whether by `shutdown` or by a failed task.
    pub fn wait_for_completion(&self, timeout: Duration) -> bool {
        self.completion.wait(timeout, &self.cancel)
    }

    pub fn vehicles_terminated(&self) -> u64 {
        self.completion.done()
    }

    /// False once cancelled. A failed task cancels the simulation on its own;
    /// `shutdown` still has to be called to join the tasks.
    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Cancels every task and blocks until all of them have exited. Later
    /// calls return the first report without doing anything.
    pub fn shutdown(&self) -> ShutdownReport {
        let mut lifecycle = lock(&self.lifecycle);
        match lifecycle.workers.take() {
            Some(workers) => {
                let report = self.quiesce(workers);
                lifecycle.report = Some(report.clone());
                report
            }
            None => lifecycle.report.clone().unwrap_or_default(),
        }
    }

    fn quiesce(&self, workers: Workers) -> ShutdownReport {
        self.cancel.cancel();
        let mut report = ShutdownReport::default();

        match join_task(workers.controller) {
            Ok(flips) => report.light_flips = flips,
            Err(err) => report.record(err),
        }
        // The spawner is joined before draining so no task is added afterwards.
        match join_task(workers.spawner) {
            Ok(spawned) => report.vehicles_spawned = spawned,
            Err(err) => report.record(err),
        }

        let vehicles = std::mem::take(&mut *lock(&workers.vehicles));
        for task in vehicles {
            report.vehicles_joined += 1;
            match join_task(task) {
                Ok(VehicleOutcome::Crossed { .. }) => report.vehicles_crossed += 1,
                Ok(VehicleOutcome::Cancelled { .. }) => report.vehicles_cancelled += 1,
                Err(err) => report.record(err),
            }
        }

        info!(
            joined = report.vehicles_joined,
            crossed = report.vehicles_crossed,
            cancelled = report.vehicles_cancelled,
            flips = report.light_flips,
            errors = report.errors.len(),
            "simulation shut down"
        );
        report
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn join_task<T>(task: JoinHandle<SimResult<T>>) -> SimResult<T> {
    let name = task.thread().name().unwrap_or("unnamed").to_string();
    task.join()
        .map_err(|_| SimError::Internal(format!("task {} panicked", name)))?
}
