//! Traffic light alternation.
//!
//! The controller owns the only light permit in circulation between ticks. On
//! each tick it takes the permit back from the green side, waiting for a
//! crossing vehicle to finish if necessary, and hands it to the other side.

use crate::approach::Approach;
use crate::error::SimResult;
use crate::intersection::Intersection;
use crate::sync::CancelToken;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum LightState {
    AGreen,
    BGreen,
}

impl LightState {
    pub fn green_for(approach: Approach) -> LightState {
        match approach {
            Approach::A => LightState::AGreen,
            Approach::B => LightState::BGreen,
        }
    }

    pub fn green(&self) -> Approach {
        match self {
            LightState::AGreen => Approach::A,
            LightState::BGreen => Approach::B,
        }
    }

    pub fn flipped(&self) -> LightState {
        LightState::green_for(self.green().other())
    }

    fn to_u8(self) -> u8 {
        self.green().index() as u8
    }

    fn from_u8(raw: u8) -> LightState {
        if raw == 0 {
            LightState::AGreen
        } else {
            LightState::BGreen
        }
    }
}

/// Light state published by the controller. Readers never write it.
pub struct LightSignal {
    state: AtomicU8,
    flips: AtomicU64,
    next_tick_ms: AtomicU64,
    epoch: Instant,
}

impl LightSignal {
    pub fn new() -> Self {
        LightSignal {
            state: AtomicU8::new(LightState::AGreen.to_u8()),
            flips: AtomicU64::new(0),
            next_tick_ms: AtomicU64::new(0),
            epoch: Instant::now(),
        }
    }

    pub fn state(&self) -> LightState {
        LightState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Number of completed ticks.
    pub fn flips(&self) -> u64 {
        self.flips.load(Ordering::SeqCst)
    }

    /// Best effort: zero once the deadline passed, even if the flip is still
    /// waiting for a crossing vehicle.
    pub fn ms_until_next_tick(&self) -> u64 {
        let now = self.elapsed_ms();
        self.next_tick_ms.load(Ordering::SeqCst).saturating_sub(now)
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn schedule_next(&self, interval: Duration) {
        let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self.next_tick_ms
            .store(self.elapsed_ms().saturating_add(interval_ms), Ordering::SeqCst);
    }

    fn publish(&self, state: LightState) {
        self.state.store(state.to_u8(), Ordering::SeqCst);
        self.flips.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for LightSignal {
    fn default() -> Self {
        Self::new()
    }
}

pub type LightChangeCallback = Box<dyn Fn(LightState) + Send + Sync>;

/// Callbacks fired after every tick.
#[derive(Default)]
pub struct LightListeners {
    callbacks: RwLock<Vec<LightChangeCallback>>,
}

impl LightListeners {
    pub fn register(&self, callback: LightChangeCallback) {
        self.callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }

    /// Fire-and-forget: a panicking callback is logged and skipped.
    /// Callbacks must not register new listeners.
    pub fn notify(&self, state: LightState) {
        let callbacks = self.callbacks.read().unwrap_or_else(PoisonError::into_inner);
        for callback in callbacks.iter() {
            if panic::catch_unwind(AssertUnwindSafe(|| callback(state))).is_err() {
                warn!(?state, "light change callback panicked");
            }
        }
    }
}

pub struct Controller {
    tick_interval: Duration,
    green: Approach,
    intersection: Arc<Intersection>,
    signal: Arc<LightSignal>,
    listeners: Arc<LightListeners>,
}

impl Controller {
    /// Expects the intersection in its initial state: light A holds the permit.
    pub fn new(
        tick_interval: Duration,
        intersection: Arc<Intersection>,
        signal: Arc<LightSignal>,
        listeners: Arc<LightListeners>,
    ) -> Self {
        Controller {
            tick_interval,
            green: signal.state().green(),
            intersection,
            signal,
            listeners,
        }
    }

    /// Alternates the lights until cancelled. Returns the number of ticks performed.
    pub fn run(&mut self, cancel: &CancelToken) -> SimResult<u64> {
        let tick_ms = u64::try_from(self.tick_interval.as_millis()).unwrap_or(u64::MAX);
        info!(tick_ms, "light controller started");
        let mut ticks = 0;
        loop {
            match self.tick(cancel) {
                Ok(state) => {
                    ticks += 1;
                    debug!(tick = ticks, ?state, "tick complete");
                }
                Err(err) if err.is_cancelled() => break,
                Err(err) => return Err(err),
            }
        }
        info!(ticks, "light controller stopped");
        Ok(ticks)
    }

    fn tick(&mut self, cancel: &CancelToken) -> SimResult<LightState> {
        self.signal.schedule_next(self.tick_interval);
        cancel.sleep(self.tick_interval)?;

        let green = self.green;
        let red = green.other();

        // Blocks while a vehicle on the green side is mid-crossing.
        self.intersection.light(green).acquire(cancel)?;
        self.intersection.light(red).release();
        self.green = red;

        let state = LightState::green_for(red);
        self.signal.publish(state);
        info!(green = %red, "light switched");

        self.listeners.notify(state);
        Ok(state)
    }
}
