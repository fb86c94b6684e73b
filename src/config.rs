use crate::constants::*;
use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Options recognized by [`start_simulation`](crate::start_simulation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationConfig {
    pub vehicle_count_per_approach: u32,
    pub spawn_interval_ms: u64,
    pub tick_interval_ms: u64,
    pub crossing_duration_ms: u64,
    /// Upper bound of a random delay added to every spawn gap.
    pub spawn_jitter_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            vehicle_count_per_approach: VEHICLE_COUNT_PER_APPROACH,
            spawn_interval_ms: VEHICLE_SPAWN_INTERVAL_MS,
            tick_interval_ms: LIGHT_TICK_INTERVAL_MS,
            crossing_duration_ms: CROSSING_DURATION_MS,
            spawn_jitter_ms: SPAWN_JITTER_MS,
        }
    }
}

/// Signed mirror of [`SimulationConfig`] so that a negative number parses
/// and can be rejected as an invalid argument rather than as bad JSON.
#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    vehicle_count_per_approach: i64,
    spawn_interval_ms: i64,
    tick_interval_ms: i64,
    crossing_duration_ms: i64,
    spawn_jitter_ms: i64,
}

impl Default for RawConfig {
    fn default() -> Self {
        let defaults = SimulationConfig::default();
        RawConfig {
            vehicle_count_per_approach: i64::from(defaults.vehicle_count_per_approach),
            spawn_interval_ms: signed(defaults.spawn_interval_ms),
            tick_interval_ms: signed(defaults.tick_interval_ms),
            crossing_duration_ms: signed(defaults.crossing_duration_ms),
            spawn_jitter_ms: signed(defaults.spawn_jitter_ms),
        }
    }
}

fn signed(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn in_range<T: TryFrom<i64>>(field: &str, value: i64) -> SimResult<T> {
    if value < 0 {
        return Err(SimError::InvalidArgument(format!(
            "{} must be non-negative, got {}",
            field, value
        )));
    }
    T::try_from(value)
        .map_err(|_| SimError::InvalidArgument(format!("{} is out of range: {}", field, value)))
}

impl TryFrom<RawConfig> for SimulationConfig {
    type Error = SimError;

    fn try_from(raw: RawConfig) -> SimResult<Self> {
        Ok(SimulationConfig {
            vehicle_count_per_approach: in_range(
                "vehicle_count_per_approach",
                raw.vehicle_count_per_approach,
            )?,
            spawn_interval_ms: in_range("spawn_interval_ms", raw.spawn_interval_ms)?,
            tick_interval_ms: in_range("tick_interval_ms", raw.tick_interval_ms)?,
            crossing_duration_ms: in_range("crossing_duration_ms", raw.crossing_duration_ms)?,
            spawn_jitter_ms: in_range("spawn_jitter_ms", raw.spawn_jitter_ms)?,
        })
    }
}

impl SimulationConfig {
    /// Syntax errors, wrong types and unknown keys are `Config` errors;
    /// negative or out-of-range values are `InvalidArgument`.
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let raw: RawConfig =
            serde_json::from_str(json).map_err(|e| SimError::Config(e.to_string()))?;
        let config = SimulationConfig::try_from(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| SimError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.tick_interval_ms == 0 {
            return Err(SimError::InvalidArgument(
                "tick_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_vehicle_count(mut self, count: u32) -> Self {
        self.vehicle_count_per_approach = count;
        self
    }

    pub fn with_spawn_interval_ms(mut self, ms: u64) -> Self {
        self.spawn_interval_ms = ms;
        self
    }

    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    pub fn with_crossing_duration_ms(mut self, ms: u64) -> Self {
        self.crossing_duration_ms = ms;
        self
    }

    pub fn with_spawn_jitter_ms(mut self, ms: u64) -> Self {
        self.spawn_jitter_ms = ms;
        self
    }

    pub fn spawn_interval(&self) -> Duration {
        Duration::from_millis(self.spawn_interval_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn crossing_duration(&self) -> Duration {
        Duration::from_millis(self.crossing_duration_ms)
    }
}
