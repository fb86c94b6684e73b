mod handle;
mod spawner;

pub use handle::{ShutdownReport, SimulationHandle, SimulationSnapshot};

use crate::config::SimulationConfig;
use crate::error::SimResult;
use crate::observer::{NoopObserver, VehicleObserver};
use std::sync::Arc;

/// Starts the light controller and the vehicle spawner.
pub fn start_simulation(config: SimulationConfig) -> SimResult<SimulationHandle> {
    start_simulation_with_observer(config, Arc::new(NoopObserver))
}

/// Like [`start_simulation`], reporting every vehicle transition to `observer`.
pub fn start_simulation_with_observer(
    config: SimulationConfig,
    observer: Arc<dyn VehicleObserver>,
) -> SimResult<SimulationHandle> {
    SimulationHandle::start(config, observer)
}
