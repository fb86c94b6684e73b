//! Two-approach traffic intersection driven by counting semaphores.
//!
//! Vehicles on approaches A and B each take a lane permit and then a light
//! permit before crossing. A controller thread moves the single light permit
//! between the approaches on a fixed tick. Everything here is headless; the
//! optional `gui` feature adds an SDL2 window on top of [`SimulationHandle`].

pub mod approach;
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod intersection;
pub mod observer;
pub mod simulation;
pub mod statistics;
pub mod sync;
pub mod vehicle;

#[cfg(feature = "gui")]
pub mod rendering;

pub use approach::Approach;
pub use config::SimulationConfig;
pub use controller::LightState;
pub use error::{SimError, SimResult};
pub use observer::{PermitEvent, PermitKind, Stage, VehicleId, VehicleObserver};
pub use simulation::{
    start_simulation, start_simulation_with_observer, ShutdownReport, SimulationHandle,
    SimulationSnapshot,
};
pub use statistics::{StatisticsSnapshot, StatisticsTracker};
pub use sync::{CancelToken, Semaphore};
