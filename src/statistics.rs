// src/statistics.rs - live counters shared by every vehicle task
use crate::approach::Approach;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::warn;

#[derive(Default)]
struct ApproachCounters {
    spawned: AtomicU64,
    crossed: AtomicU64,
    total_wait_ms: AtomicU64,
}

impl ApproachCounters {
    fn reset(&self) {
        self.spawned.store(0, Ordering::SeqCst);
        self.crossed.store(0, Ordering::SeqCst);
        self.total_wait_ms.store(0, Ordering::SeqCst);
    }
}

/// Concurrency-safe counters and wait-time sums for both approaches.
///
/// Only totals and counts are stored. Averages and the waiting count
/// (`spawned - crossed`) are derived in [`StatisticsTracker::snapshot`].
#[derive(Default)]
pub struct StatisticsTracker {
    approaches: [ApproachCounters; 2],
}

impl StatisticsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self, approach: Approach) -> &ApproachCounters {
        &self.approaches[approach.index()]
    }

    pub fn vehicle_started(&self, approach: Approach) {
        let counters = self.counters(approach);
        counters.spawned.fetch_add(1, Ordering::SeqCst);
    }

    pub fn vehicle_crossed(&self, approach: Approach, wait_ms: u64) {
        let counters = self.counters(approach);
        counters.total_wait_ms.fetch_add(wait_ms, Ordering::SeqCst);
        let crossed = counters.crossed.fetch_add(1, Ordering::SeqCst) + 1;
        if crossed > counters.spawned.load(Ordering::SeqCst) {
            // Only reachable when reset() ran while vehicles were in flight.
            warn!(%approach, "crossed vehicle had no matching start");
        }
    }

    /// Zeros every counter. The caller must ensure no vehicle is between
    /// `vehicle_started` and `vehicle_crossed`.
    pub fn reset(&self) {
        for counters in &self.approaches {
            counters.reset();
        }
    }

    /// Per approach, `waiting + crossed == spawned` holds exactly. Fields of
    /// different approaches may be up to one update apart.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        let [a, b] = &self.approaches;

        // crossed before spawned: a vehicle is never counted as crossed but not spawned
        let crossed_a = a.crossed.load(Ordering::SeqCst);
        let crossed_b = b.crossed.load(Ordering::SeqCst);
        let wait_a = a.total_wait_ms.load(Ordering::SeqCst);
        let wait_b = b.total_wait_ms.load(Ordering::SeqCst);
        let spawned_a = a.spawned.load(Ordering::SeqCst).max(crossed_a);
        let spawned_b = b.spawned.load(Ordering::SeqCst).max(crossed_b);

        StatisticsSnapshot {
            spawned_a,
            spawned_b,
            waiting_a: spawned_a - crossed_a,
            waiting_b: spawned_b - crossed_b,
            crossed_a,
            crossed_b,
            avg_wait_ms_a: average(wait_a, crossed_a),
            avg_wait_ms_b: average(wait_b, crossed_b),
            avg_wait_ms_overall: average(wait_a + wait_b, crossed_a + crossed_b),
        }
    }
}

fn average(total_ms: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total_ms as f64 / count as f64
    }
}

/// Read-only view of the tracker at roughly one instant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct StatisticsSnapshot {
    pub spawned_a: u64,
    pub spawned_b: u64,
    pub crossed_a: u64,
    pub crossed_b: u64,
    pub waiting_a: u64,
    pub waiting_b: u64,
    pub avg_wait_ms_a: f64,
    pub avg_wait_ms_b: f64,
    pub avg_wait_ms_overall: f64,
}

impl StatisticsSnapshot {
    pub fn crossed(&self, approach: Approach) -> u64 {
        match approach {
            Approach::A => self.crossed_a,
            Approach::B => self.crossed_b,
        }
    }

    pub fn waiting(&self, approach: Approach) -> u64 {
        match approach {
            Approach::A => self.waiting_a,
            Approach::B => self.waiting_b,
        }
    }

    pub fn spawned(&self, approach: Approach) -> u64 {
        match approach {
            Approach::A => self.spawned_a,
            Approach::B => self.spawned_b,
        }
    }

    pub fn avg_wait_ms(&self, approach: Approach) -> f64 {
        match approach {
            Approach::A => self.avg_wait_ms_a,
            Approach::B => self.avg_wait_ms_b,
        }
    }

    pub fn total_crossed(&self) -> u64 {
        self.crossed_a + self.crossed_b
    }

    pub fn display(&self, elapsed: Duration) {
        let elapsed_sec = elapsed.as_secs_f64();

        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      FINAL STATISTICS                        ║");
        println!("╠══════════════════════════════════════════════════════════════╣");
        println!("║ Simulation Duration: {:>8.1}s                               ║", elapsed_sec);
        println!("║ Vehicles Spawned:    A {:<8} B {:<8}                     ║", self.spawned_a, self.spawned_b);
        println!("║ Total Crossed: {:<12}                                  ║", self.total_crossed());
        let throughput = if elapsed_sec > 0.0 { self.total_crossed() as f64 * 60.0 / elapsed_sec } else { 0.0 };
        println!("║ Throughput: {:>16.1} veh/min                        ║", throughput);

        println!("╠══════════════════════════════════════════════════════════════╣");
        for approach in Approach::ALL {
            println!(
                "║ Approach {}: crossed {:<6} waiting {:<6} avg wait {:>8.1} ms ║",
                approach,
                self.crossed(approach),
                self.waiting(approach),
                self.avg_wait_ms(approach)
            );
        }

        println!("╠══════════════════════════════════════════════════════════════╣");
        println!("║ Overall Avg Wait: {:>10.1} ms                              ║", self.avg_wait_ms_overall);
        println!("╚══════════════════════════════════════════════════════════════╝");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn empty_tracker_reports_zero_averages() {
        let snapshot = StatisticsTracker::new().snapshot();
        assert_eq!(snapshot, StatisticsSnapshot::default());
        assert_eq!(snapshot.avg_wait_ms_overall, 0.0);
    }

    #[test]
    fn started_then_crossed_moves_waiting_to_crossed() {
        let tracker = StatisticsTracker::new();
        tracker.vehicle_started(Approach::A);
        tracker.vehicle_started(Approach::A);
        tracker.vehicle_started(Approach::B);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.waiting_a, 2);
        assert_eq!(snapshot.waiting_b, 1);
        assert_eq!(snapshot.spawned_a, 2);

        tracker.vehicle_crossed(Approach::A, 100);
        tracker.vehicle_crossed(Approach::A, 300);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.crossed_a, 2);
        assert_eq!(snapshot.waiting_a, 0);
        assert_eq!(snapshot.avg_wait_ms_a, 200.0);
        assert_eq!(snapshot.avg_wait_ms_b, 0.0);
        assert_eq!(snapshot.avg_wait_ms_overall, 200.0);
    }

    #[test]
    fn overall_average_weights_by_crossed_count() {
        let tracker = StatisticsTracker::new();
        for _ in 0..3 {
            tracker.vehicle_started(Approach::A);
            tracker.vehicle_crossed(Approach::A, 10);
        }
        tracker.vehicle_started(Approach::B);
        tracker.vehicle_crossed(Approach::B, 50);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.avg_wait_ms_a, 10.0);
        assert_eq!(snapshot.avg_wait_ms_b, 50.0);
        assert_eq!(snapshot.avg_wait_ms_overall, 20.0);
        assert_eq!(snapshot.total_crossed(), 4);
    }

    #[test]
    fn reset_zeroes_everything() {
        let tracker = StatisticsTracker::new();
        tracker.vehicle_started(Approach::B);
        tracker.vehicle_crossed(Approach::B, 42);
        tracker.reset();
        assert_eq!(tracker.snapshot(), StatisticsSnapshot::default());
    }

    #[test]
    fn unmatched_crossing_never_underflows_waiting() {
        let tracker = StatisticsTracker::new();
        tracker.vehicle_crossed(Approach::A, 5);
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.waiting_a, 0);
        assert_eq!(snapshot.crossed_a, 1);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let tracker = Arc::new(StatisticsTracker::new());
        let workers: Vec<_> = (0..8)
            .map(|i| {
                let tracker = tracker.clone();
                let approach = if i % 2 == 0 { Approach::A } else { Approach::B };
                thread::spawn(move || {
                    for _ in 0..1000 {
                        tracker.vehicle_started(approach);
                        tracker.vehicle_crossed(approach, 2);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.crossed_a, 4000);
        assert_eq!(snapshot.crossed_b, 4000);
        assert_eq!(snapshot.waiting_a + snapshot.waiting_b, 0);
        assert_eq!(snapshot.avg_wait_ms_overall, 2.0);
    }

    #[test]
    fn snapshots_balance_while_vehicles_move() {
        let tracker = Arc::new(StatisticsTracker::new());
        let writer = {
            let tracker = tracker.clone();
            thread::spawn(move || {
                for _ in 0..20_000 {
                    tracker.vehicle_started(Approach::A);
                    tracker.vehicle_crossed(Approach::A, 1);
                }
            })
        };
        while !writer.is_finished() {
            let snapshot = tracker.snapshot();
            assert_eq!(snapshot.waiting_a + snapshot.crossed_a, snapshot.spawned_a);
        }
        writer.join().unwrap();
    }
}
