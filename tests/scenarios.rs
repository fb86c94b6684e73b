mod common;

use carrefour::{start_simulation, start_simulation_with_observer, Approach, Stage};
use common::{config, Recorder};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const GENEROUS: Duration = Duration::from_secs(10);

#[test]
fn lights_keep_flipping_with_no_traffic() {
    let handle = start_simulation(config(0, 0, 50, 10)).unwrap();
    thread::sleep(Duration::from_millis(200));

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.statistics.crossed_a, 0);
    assert_eq!(snapshot.statistics.crossed_b, 0);
    assert!(snapshot.light_flips >= 3, "only {} flips", snapshot.light_flips);
    assert!(handle.wait_for_completion(Duration::ZERO));

    let report = handle.shutdown();
    assert_eq!(report.vehicles_spawned, 0);
    assert!(report.errors.is_empty());
    assert_eq!(handle.permit_counts().lights_total(), 1);
}

#[test]
fn first_green_goes_to_a_and_b_waits_for_the_flip() {
    let tick = Duration::from_millis(200);
    let recorder = Arc::new(Recorder::default());
    let handle = start_simulation_with_observer(config(1, 0, 200, 10), recorder.clone()).unwrap();

    assert!(handle.wait_for_completion(GENEROUS));

    let a = recorder.crossings_on(Approach::A);
    let b = recorder.crossings_on(Approach::B);
    assert_eq!((a.len(), b.len()), (1, 1));
    assert!(a[0].wait < Duration::from_millis(50), "A waited {:?}", a[0].wait);
    assert!(b[0].wait >= tick * 9 / 10, "B waited {:?}", b[0].wait);
    assert!(b[0].wait < tick * 3, "B waited {:?}", b[0].wait);

    // A crossed before the first flip, B after it.
    let log = recorder.log();
    assert_eq!(log.crossings[0].approach, Approach::A);
}

#[test]
fn queued_vehicles_all_finish_with_bounded_wait() {
    let handle = start_simulation(config(5, 0, 50, 10)).unwrap();
    assert!(handle.wait_for_completion(GENEROUS));

    let stats = handle.snapshot().statistics;
    assert_eq!(stats.crossed_a, 5);
    assert_eq!(stats.crossed_b, 5);
    assert!(
        stats.avg_wait_ms_overall <= 5.0 * 50.0,
        "average wait {} ms",
        stats.avg_wait_ms_overall
    );

    let report = handle.shutdown();
    assert_eq!(report.vehicles_crossed, 10);
    assert_eq!(report.vehicles_cancelled, 0);
}

#[test]
fn shutdown_after_first_crossing_returns_every_permit() {
    let recorder = Arc::new(Recorder::default());
    let handle = start_simulation_with_observer(config(5, 20, 100, 20), recorder.clone()).unwrap();

    assert!(recorder.wait_for_crossings(1, GENEROUS));
    let report = handle.shutdown();

    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert!(report.vehicles_crossed >= 1);
    assert_eq!(report.vehicles_joined, report.vehicles_spawned);
    assert_eq!(
        report.vehicles_crossed + report.vehicles_cancelled,
        report.vehicles_joined
    );

    let counts = handle.permit_counts();
    assert_eq!(counts.lights_total(), 1);
    assert_eq!(counts.lane_a, 1);
    assert_eq!(counts.lane_b, 1);

    let stats = handle.snapshot().statistics;
    for approach in Approach::ALL {
        assert_eq!(
            stats.waiting(approach) + stats.crossed(approach),
            stats.spawned(approach)
        );
    }
    assert_eq!(stats.total_crossed(), report.vehicles_crossed);

    let log = recorder.log();
    assert_eq!(log.cancelled.len() as u64, report.vehicles_cancelled);
    assert!(log.cancelled.iter().all(|(_, stage)| *stage < Stage::Finished));
}

#[test]
fn second_vehicle_in_a_lane_waits_for_the_first_to_cross() {
    let crossing = Duration::from_millis(50);
    let recorder = Arc::new(Recorder::default());
    // Long tick: both A vehicles cross in the first green phase, B never does.
    let handle = start_simulation_with_observer(config(2, 0, 5_000, 50), recorder.clone()).unwrap();

    assert!(recorder.wait_for_crossings(2, Duration::from_secs(3)));
    handle.shutdown();

    let a = recorder.crossings_on(Approach::A);
    assert_eq!(a.len(), 2);
    assert!(recorder.crossings_on(Approach::B).is_empty());
    // Allow for the gap between the two vehicles being created.
    assert!(
        a[1].wait + Duration::from_millis(5) >= crossing,
        "second vehicle waited {:?}",
        a[1].wait
    );
}

#[test]
fn neither_approach_starves_across_flips() {
    let handle = start_simulation(config(10, 10, 100, 5)).unwrap();
    assert!(handle.wait_for_completion(GENEROUS));

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.statistics.crossed_a, 10);
    assert_eq!(snapshot.statistics.crossed_b, 10);
    assert_eq!(snapshot.statistics.waiting_a, 0);
    assert_eq!(snapshot.statistics.waiting_b, 0);
    assert!(snapshot.light_flips >= 1);
}
