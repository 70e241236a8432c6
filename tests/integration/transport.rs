//! Transport integration tests
//!
//! The transport is advisory: the host reads it once per processed block and
//! hands the unit a snapshot.

use crate::helpers::tolerances::POSITION_EPSILON;
use crate::helpers::*;
use approx::assert_abs_diff_eq;

#[test]
fn test_stopped_by_default() {
    let (host, _) = test_host(TEST_BLOCK_SIZE);
    let transport = host.transport();
    assert!(!transport.is_playing());
    assert!(!transport.is_recording());
    assert!(!transport.is_looping());
    assert_eq!(transport.tempo(), 120.0);
    assert_eq!(transport.time_signature(), (4, 4));
}

#[test]
fn test_auto_advance_over_one_second() {
    let (host, _) = test_host_with(
        blockhost::builder()
            .block_size(TEST_BLOCK_SIZE)
            .transport_auto_advance(true),
    );
    host.transport().set_playing(true);

    run_ramp(&host, TEST_SAMPLE_RATE as usize, TEST_BLOCK_SIZE);

    let transport = host.transport();
    assert_eq!(transport.time_in_samples(), TEST_SAMPLE_RATE as i64);
    assert_abs_diff_eq!(transport.time_in_seconds(), 1.0, epsilon = 1e-6);
    // 120 BPM: two quarter notes per second.
    assert_abs_diff_eq!(transport.position(), 2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(transport.last_bar_position(), 0.0, epsilon = POSITION_EPSILON);
}

#[test]
fn test_auto_advance_is_opt_in() {
    let (host, _) = test_host(TEST_BLOCK_SIZE);
    host.transport().set_playing(true);
    run_ramp(&host, 480, 16);
    assert_eq!(host.transport().time_in_samples(), 0);

    host.set_transport_auto_advance(true);
    run_ramp(&host, 480, 16);
    assert_eq!(host.transport().time_in_samples(), 480);
}

#[test]
fn test_auto_advance_wraps_loop() {
    let (host, _) = test_host_with(
        blockhost::builder()
            .block_size(TEST_BLOCK_SIZE)
            .transport_auto_advance(true),
    );
    let transport = host.transport();
    transport.set_loop_points(0.0, 1.0);
    transport.set_looping(true);
    transport.set_playing(true);

    // 0.75 s at 120 BPM is 1.5 quarters: wraps to 0.5.
    run_ramp(&host, 36000, TEST_BLOCK_SIZE);
    assert_abs_diff_eq!(transport.position(), 0.5, epsilon = 1e-6);
}

#[test]
fn test_unit_sees_transport_snapshot() {
    let (host, log) = test_host(TEST_BLOCK_SIZE);
    host.load(RECORDER_LOCATOR).unwrap();

    let transport = host.transport();
    transport.set_tempo(90.0);
    transport.set_time_signature(3, 4);
    transport.set_position(12.0);
    transport.set_last_bar_position(9.0);
    transport.set_playing(true);
    transport.set_recording(true);

    run_ramp(&host, TEST_BLOCK_SIZE, TEST_BLOCK_SIZE);

    let log = log.lock().unwrap();
    let seen = log[0].transport;
    assert!(seen.playing);
    assert!(seen.recording);
    assert_eq!(seen.tempo, 90.0);
    assert_eq!((seen.time_sig_numerator, seen.time_sig_denominator), (3, 4));
    assert_eq!(seen.position_quarters, 12.0);
    assert_eq!(seen.bar_position_quarters, 9.0);
}

#[test]
fn test_fields_are_independent() {
    let (host, _) = test_host(TEST_BLOCK_SIZE);
    let transport = host.transport();
    transport.set_loop_start(4.0);
    transport.set_loop_end(2.0);
    assert_eq!(transport.loop_start(), 4.0);
    assert_eq!(transport.loop_end(), 2.0);

    transport.set_time_in_samples(-10);
    assert_eq!(transport.time_in_samples(), -10);
    transport.set_time_in_seconds(3.5);
    assert_eq!(transport.time_in_seconds(), 3.5);
}
