//! Barrier rendezvous: all arrive before any proceeds.

use std::time::Duration;

use koan::sync::rendezvous::rendezvous;

/// With every worker sleeping a different duration, no worker's
/// post-barrier code starts before the last worker has arrived:
/// max(arrival) <= min(resume) on monotonic timestamps.
#[test]
fn no_resume_before_last_arrival() {
    let durations: Vec<Duration> = (0..8u64).map(|w| Duration::from_millis(3 * w + 1)).collect();
    let report = rendezvous(&durations).unwrap();

    assert_eq!(report.workers(), 8);
    assert!(
        report.holds(),
        "worker resumed {:?} before the last arrival",
        report
            .max_arrival()
            .duration_since(report.min_resume())
    );
    assert!(report.max_arrival() <= report.min_resume());
}

/// The invariant is not a fluke of one interleaving; it holds across
/// repeated staggered runs.
#[test]
fn rendezvous_holds_across_repeated_runs() {
    for trial in 0..10 {
        let durations = vec![
            Duration::from_millis(1),
            Duration::from_millis(7),
            Duration::from_millis(2),
            Duration::from_millis(11),
        ];
        let report = rendezvous(&durations).unwrap();
        assert!(report.holds(), "violated on trial {}", trial);
    }
}

/// The slowest sleeper is (modulo scheduling noise) the release point:
/// every resume happens at or after its arrival.
#[test]
fn slowest_worker_gates_the_release() {
    let durations = vec![
        Duration::from_millis(1),
        Duration::from_millis(1),
        Duration::from_millis(40),
    ];
    let report = rendezvous(&durations).unwrap();
    for w in 0..report.workers() {
        assert!(report.resume(w) >= report.arrival(2));
    }
}
