#![allow(dead_code)]

use carrefour::{Approach, PermitEvent, PermitKind, SimulationConfig, Stage, VehicleId, VehicleObserver};
use std::collections::HashMap;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

pub fn config(vehicles: u32, spawn_ms: u64, tick_ms: u64, crossing_ms: u64) -> SimulationConfig {
    SimulationConfig::default()
        .with_vehicle_count(vehicles)
        .with_spawn_interval_ms(spawn_ms)
        .with_tick_interval_ms(tick_ms)
        .with_crossing_duration_ms(crossing_ms)
}

#[derive(Debug, Clone, Copy)]
pub struct Crossing {
    pub vehicle: VehicleId,
    pub approach: Approach,
    pub wait: Duration,
}

#[derive(Default)]
pub struct Log {
    pub permits: HashMap<VehicleId, Vec<PermitEvent>>,
    pub stages: HashMap<VehicleId, Vec<Stage>>,
    pub crossings: Vec<Crossing>,
    pub cancelled: Vec<(VehicleId, Stage)>,
    crossing_now: Vec<(VehicleId, Approach)>,
    pub max_concurrent_crossing: usize,
    light_holders: usize,
    pub mixed_approaches_crossing: bool,
}

/// Records every hook call so tests can check ordering after the fact.
#[derive(Default)]
pub struct Recorder {
    log: Mutex<Log>,
    crossed: Condvar,
}

impl Recorder {
    pub fn log(&self) -> std::sync::MutexGuard<'_, Log> {
        self.log.lock().unwrap()
    }

    /// Waits until at least `count` vehicles crossed.
    pub fn wait_for_crossings(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut log = self.log.lock().unwrap();
        while log.crossings.len() < count {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            log = self.crossed.wait_timeout(log, deadline - now).unwrap().0;
        }
        true
    }

    /// Runs `f` with the number of vehicles holding a light permit. Vehicles
    /// cannot report a release while `f` runs, and they report it before
    /// giving the permit back, so the count never overstates real holders.
    pub fn with_light_holders<R>(&self, f: impl FnOnce(usize) -> R) -> R {
        let log = self.log.lock().unwrap();
        f(log.light_holders)
    }

    pub fn crossings_on(&self, approach: Approach) -> Vec<Crossing> {
        self.log()
            .crossings
            .iter()
            .filter(|c| c.approach == approach)
            .copied()
            .collect()
    }
}

impl VehicleObserver for Recorder {
    fn stage_changed(&self, vehicle: VehicleId, approach: Approach, stage: Stage) {
        let mut log = self.log.lock().unwrap();
        log.stages.entry(vehicle).or_default().push(stage);
        if stage == Stage::Crossing {
            if log.crossing_now.iter().any(|(_, a)| *a != approach) {
                log.mixed_approaches_crossing = true;
            }
            log.crossing_now.push((vehicle, approach));
            log.max_concurrent_crossing = log.max_concurrent_crossing.max(log.crossing_now.len());
        }
    }

    fn permit_changed(&self, vehicle: VehicleId, _approach: Approach, event: PermitEvent) {
        let mut log = self.log.lock().unwrap();
        log.permits.entry(vehicle).or_default().push(event);
        match event {
            PermitEvent::Acquired(PermitKind::Light) => log.light_holders += 1,
            PermitEvent::Releasing(PermitKind::Light) => {
                log.light_holders = log.light_holders.saturating_sub(1);
                log.crossing_now.retain(|(v, _)| *v != vehicle);
            }
            _ => {}
        }
    }

    fn crossed(&self, vehicle: VehicleId, approach: Approach, wait: Duration) {
        let mut log = self.log.lock().unwrap();
        log.crossings.push(Crossing {
            vehicle,
            approach,
            wait,
        });
        self.crossed.notify_all();
    }

    fn cancelled(&self, vehicle: VehicleId, _approach: Approach, stage: Stage) {
        self.log.lock().unwrap().cancelled.push((vehicle, stage));
    }
}
