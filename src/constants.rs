use std::time::Duration;

pub const VEHICLE_COUNT_PER_APPROACH: u32 = 100;
pub const VEHICLE_SPAWN_INTERVAL_MS: u64 = 600;
pub const LIGHT_TICK_INTERVAL_MS: u64 = 2000;
pub const CROSSING_DURATION_MS: u64 = 100;
pub const SPAWN_JITTER_MS: u64 = 0;

// Light semaphores start with A holding the only permit; both lanes admit one car.
pub const LIGHT_A_INITIAL_PERMITS: i64 = 1;
pub const LIGHT_B_INITIAL_PERMITS: i64 = 0;
pub const LANE_INITIAL_PERMITS: i64 = 1;

pub const SNAPSHOT_LOG_INTERVAL: Duration = Duration::from_secs(1);
