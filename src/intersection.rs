use crate::approach::Approach;
use crate::constants::*;
use crate::error::SimResult;
use crate::sync::Semaphore;
use serde::Serialize;

/// The four semaphores shared by every task: one lane and one light per approach.
#[derive(Debug)]
pub struct Intersection {
    lanes: [Semaphore; 2],
    lights: [Semaphore; 2],
}

impl Intersection {
    /// Light A starts green; each lane admits one vehicle to the stop line.
    pub fn new() -> SimResult<Self> {
        Ok(Intersection {
            lanes: [
                Semaphore::new(LANE_INITIAL_PERMITS, "lane_a")?,
                Semaphore::new(LANE_INITIAL_PERMITS, "lane_b")?,
            ],
            lights: [
                Semaphore::new(LIGHT_A_INITIAL_PERMITS, "light_a")?,
                Semaphore::new(LIGHT_B_INITIAL_PERMITS, "light_b")?,
            ],
        })
    }

    pub fn lane(&self, approach: Approach) -> &Semaphore {
        &self.lanes[approach.index()]
    }

    pub fn light(&self, approach: Approach) -> &Semaphore {
        &self.lights[approach.index()]
    }

    /// Both light counts come from one instant, so a permit moving between
    /// the lights is never counted twice. Lane counts are read separately.
    pub fn permit_counts(&self) -> PermitCounts {
        let (light_a, light_b) = {
            let a = self.lights[0].count_guard();
            let b = self.lights[1].count_guard();
            (*a, *b)
        };
        PermitCounts {
            lane_a: self.lanes[0].peek_count(),
            lane_b: self.lanes[1].peek_count(),
            light_a,
            light_b,
        }
    }
}

/// Diagnostic view of the semaphore counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermitCounts {
    pub lane_a: usize,
    pub lane_b: usize,
    pub light_a: usize,
    pub light_b: usize,
}

impl PermitCounts {
    pub fn lights_total(&self) -> usize {
        self.light_a + self.light_b
    }
}
