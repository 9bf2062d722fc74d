//! Seeking through the index must give the same values as reading linearly

mod common;

use common::{
    init_logging, linear_motion_log, status_record, stepq_record, trapq_record, LogFixture,
};
use motion_log_decoder::{Session, SessionConfig};
use std::io::Cursor;

/// Ten seconds of +x motion at 1 mm/s with a 0.1 mm stepper following it
fn motion_with_steps() -> LogFixture {
    let mut log = LogFixture::new();
    for i in 0..10 {
        let t = i as f64;
        log.snapshot(t).record(status_record(t));
        log.record(trapq_record(
            "trapq:toolhead",
            &[(t, 1.0, 1.0, 0.0, [t, 0.0, 0.0], [1.0, 0.0, 0.0])],
        ));
        log.record(stepq_record(
            "stepq:stepper_x",
            i * 1_000_000,
            t,
            0.1,
            &[(100_000, 10, 0)],
        ));
    }
    log
}

fn session(log: LogFixture) -> Session<Cursor<Vec<u8>>> {
    let (main, index) = log.into_cursors();
    let mut session = Session::from_sources(main, index, SessionConfig::default());
    session.initialize().unwrap();
    session
}

#[test]
fn test_seek_matches_linear_read() {
    init_logging();
    let mut linear = session(motion_with_steps());
    let mut seeked = session(motion_with_steps());
    seeked.seek(5.5).unwrap();
    assert_eq!(seeked.start_time(), 5.5);
    // Resumed from the snapshot one margin before the target
    assert_eq!(seeked.current_status().estimated_print_time().unwrap(), 4.0);

    let names = ["trapq:toolhead:axis_x", "trapq:toolhead:velocity", "stepq:stepper_x"];
    let a: Vec<_> = names.iter().map(|n| linear.select_dataset(n).unwrap()).collect();
    let b: Vec<_> = names.iter().map(|n| seeked.select_dataset(n).unwrap()).collect();
    for k in 0..20 {
        let t = 5.55 + k as f64 * 0.1;
        for (a, b) in a.iter().zip(&b) {
            let expected = linear.pull(a, t).unwrap();
            let actual = seeked.pull(b, t).unwrap();
            assert!(
                (expected - actual).abs() < 1e-12,
                "{} at {}: {} vs {}",
                a.name,
                t,
                expected,
                actual
            );
        }
    }
}

#[test]
fn test_seek_reads_only_from_snapshot() {
    let mut session = session(linear_motion_log(10));
    session.seek(5.5).unwrap();
    let x = session.select_dataset("trapq:toolhead:axis_x").unwrap();
    assert_eq!(session.pull(&x, 5.5).unwrap(), 5.5);
    // Snapshot 4 onwards: status 4 and 5 were needed to reach segment 5
    assert_eq!(session.last_read_time(), 5.0);
}

#[test]
fn test_seek_before_first_snapshot_rewinds() {
    let mut session = session(linear_motion_log(5));
    session.seek(0.5).unwrap();
    assert_eq!(session.current_status(), session.initial_status());
    let x = session.select_dataset("trapq:toolhead:axis_x").unwrap();
    assert_eq!(session.pull(&x, 0.5).unwrap(), 0.5);
}

#[test]
fn test_seek_backwards() {
    let mut session = session(linear_motion_log(10));
    let x = session.select_dataset("trapq:toolhead:axis_x").unwrap();

    session.seek(8.0).unwrap();
    assert_eq!(session.pull(&x, 8.25).unwrap(), 8.25);

    // Descriptors survive a seek and the reconstructor starts over
    session.seek(2.0).unwrap();
    assert_eq!(session.current_status().estimated_print_time().unwrap(), 1.0);
    assert_eq!(session.pull(&x, 2.25).unwrap(), 2.25);
    assert_eq!(session.start_time(), 2.0);
}

#[test]
fn test_seek_past_end_holds_last_position() {
    let mut session = session(linear_motion_log(10));
    session.seek(100.0).unwrap();
    assert_eq!(session.current_status().estimated_print_time().unwrap(), 9.0);

    let x = session.select_dataset("trapq:toolhead:axis_x").unwrap();
    let v = session.select_dataset("trapq:toolhead:velocity").unwrap();
    assert_eq!(session.pull(&x, 100.0).unwrap(), 10.0);
    assert_eq!(session.pull(&v, 100.0).unwrap(), 0.0);
    assert!(session.is_drained());
}

#[test]
fn test_seek_is_relative_to_log_start() {
    let mut log = LogFixture::new();
    for i in 0..6 {
        let t = 1000.0 + i as f64;
        log.snapshot(t).record(status_record(t));
        log.record(trapq_record(
            "trapq:toolhead",
            &[(t, 1.0, 1.0, 0.0, [i as f64, 0.0, 0.0], [1.0, 0.0, 0.0])],
        ));
    }
    let mut session = session(log);
    assert_eq!(session.initial_start_time(), 1000.0);

    session.seek(3.0).unwrap();
    assert_eq!(session.start_time(), 1003.0);
    assert_eq!(session.current_status().estimated_print_time().unwrap(), 1002.0);
    let x = session.select_dataset("trapq:toolhead:axis_x").unwrap();
    assert_eq!(session.pull(&x, 1003.5).unwrap(), 3.5);
}
