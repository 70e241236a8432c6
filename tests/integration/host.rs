//! Host lifecycle integration tests
//!
//! Load/unload through the async gate, state files, formats, executors.

use crate::helpers::*;
use blockhost::host::Result as HostResult;
use blockhost::prelude::*;
use blockhost::{ControlExecutor, Error, HostError, LoadOutcome};
use std::sync::Arc;
use std::time::Duration;

/// Loading a locator no format recognises fails with `UnitNotFound`, leaves
/// nothing loaded, and the next tick still passes audio.
#[test]
fn test_missing_unit_fails_cleanly() {
    let (host, _) = test_host(TEST_BLOCK_SIZE);
    assert!(host.force_synchronous());

    let err = host.load("/nope/missing.vst3").unwrap_err();
    assert!(matches!(err, HostError::UnitNotFound { ref locator } if locator == "/nope/missing.vst3"));
    assert!(!host.is_loaded());
    assert!(!host.async_event_running());
    match host.last_load().as_deref() {
        Some(LoadOutcome::Failed { locator, error }) => {
            assert_eq!(locator, "/nope/missing.vst3");
            assert!(error.contains("missing.vst3"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let input = stereo_ramp(0, TEST_BLOCK_SIZE);
    let mut output = vec![0.0; input.len()];
    host.tick(&input, &mut output, TEST_BLOCK_SIZE);
    assert_eq!(output, input);
}

#[test]
fn test_load_reports_unit_details() {
    let (host, _) = test_host(TEST_BLOCK_SIZE);
    host.load(GAIN_LOCATOR).unwrap();

    assert!(host.is_loaded());
    assert_eq!(host.name(), "Gain");
    assert_eq!(host.vendor(), "blockhost tests");
    assert_eq!((host.num_inputs(), host.num_outputs()), (2, 2));
    assert_eq!(host.latency(), 0);
    assert_eq!(host.num_params(), 1);
    assert_eq!(host.find_param("gain"), Some(0));

    let outcome = host.last_load().unwrap();
    assert!(outcome.is_loaded());
    if let LoadOutcome::Loaded {
        description,
        generation,
        ..
    } = outcome.as_ref()
    {
        assert_eq!(description.format, blockhost::BUILTIN_FORMAT);
        assert_eq!(*generation, host.stats().generation);
    }
}

#[test]
fn test_reload_replaces_unit() {
    let (host, _) = test_host(TEST_BLOCK_SIZE);
    host.load(GAIN_LOCATOR).unwrap();
    host.load(RECORDER_LOCATOR).unwrap();
    assert_eq!(host.name(), "Recorder");
    assert_eq!(host.stats().generation, 2);

    host.unload().unwrap();
    assert!(!host.is_loaded());
    assert_eq!(host.name(), "");
    assert_eq!(host.stats().generation, 3);
}

#[test]
fn test_async_load_and_wait() {
    let (host, _) = test_host_with(
        blockhost::builder()
            .block_size(TEST_BLOCK_SIZE)
            .force_synchronous(false),
    );
    let idle = host.subscribe_idle();

    host.load(GAIN_LOCATOR).unwrap();
    host.set_block_size(64).unwrap();
    assert!(host.wait_for_async_events(Some(Duration::from_secs(5))));
    assert!(!host.async_event_running());
    assert!(idle.recv_timeout(Duration::from_secs(1)).is_ok());

    assert!(host.is_loaded());
    assert_eq!(host.block_size(), 64);
}

#[test]
fn test_async_failure_is_visible_in_last_load() {
    let (host, _) = test_host(TEST_BLOCK_SIZE);
    host.set_force_synchronous(false);

    host.load("builtin:does-not-exist").unwrap();
    assert!(host.wait_for_async_events(None));
    let outcome = host.last_load().unwrap();
    assert!(!outcome.is_loaded());
    assert_eq!(outcome.locator(), "builtin:does-not-exist");
}

#[test]
fn test_state_file_is_byte_for_byte() {
    let (host, _) = test_host(TEST_BLOCK_SIZE);
    host.load(GAIN_LOCATOR).unwrap();
    assert_eq!(host.set_param(0, 0.125), 0.125);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gain.state");
    host.save_state(&path).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), 0.125f32.to_le_bytes().to_vec());

    host.set_param(0, 1.0);
    host.load_state(&path).unwrap();
    assert_eq!(host.param(0), 0.125);

    // Restore into a fresh host.
    let (other, _) = test_host(TEST_BLOCK_SIZE);
    other.load(GAIN_LOCATOR).unwrap();
    other.load_state(&path).unwrap();
    assert_eq!(other.param(0), 0.125);
}

#[test]
fn test_state_errors() {
    let (host, _) = test_host(TEST_BLOCK_SIZE);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gain.state");

    assert!(matches!(host.save_state(&path), Err(HostError::NoUnitLoaded)));
    host.load(GAIN_LOCATOR).unwrap();
    assert!(matches!(
        host.load_state(dir.path().join("missing.state")),
        Err(HostError::StateRestoreError { .. })
    ));
    assert!(matches!(
        host.save_state(dir.path().join("no-such-dir").join("x.state")),
        Err(HostError::StateSaveError { .. })
    ));

    std::fs::write(&path, b"too long for a gain").unwrap();
    let err = host.load_state(&path).unwrap_err();
    assert!(err.to_string().contains("expected 4 bytes"));
}

#[test]
fn test_reset_clears_pending_events() {
    let (host, log) = test_host(TEST_BLOCK_SIZE);
    host.load(RECORDER_LOCATOR).unwrap();
    host.note_on(60, 1.0, 0);
    host.reset().unwrap();

    run_ramp(&host, TEST_BLOCK_SIZE, TEST_BLOCK_SIZE);
    assert!(log.lock().unwrap()[0].events.is_empty());
}

#[test]
fn test_invalid_config_is_rejected() {
    let err = blockhost::builder().block_size(0).build().err().unwrap();
    assert!(matches!(err, Error::Core(_)));

    let err = blockhost::builder().channels(0).build().err().unwrap();
    assert!(matches!(err, Error::Core(_)));

    let err = blockhost::builder()
        .max_block_size(32)
        .block_size(64)
        .build()
        .err()
        .unwrap();
    assert!(err.to_string().contains("64"));
}

#[test]
fn test_block_size_out_of_range() {
    let (host, _) = test_host(TEST_BLOCK_SIZE);
    assert!(host.set_block_size(0).is_err());
    assert!(host.set_block_size(blockhost::DEFAULT_MAX_BLOCK_SIZE + 1).is_err());
    assert!(host.set_block_size(blockhost::DEFAULT_MAX_BLOCK_SIZE).is_ok());
    assert_eq!(host.block_size(), blockhost::DEFAULT_MAX_BLOCK_SIZE);
}

/// A format adapter outside the builtin one, matched by prefix.
struct MemoryFormat;

impl UnitFormat for MemoryFormat {
    fn name(&self) -> &str {
        "memory"
    }

    fn might_contain(&self, locator: &str) -> bool {
        locator.starts_with("mem://")
    }

    fn scan(&self, locator: &str) -> HostResult<Vec<UnitDescription>> {
        if locator.ends_with("/empty") {
            return Ok(Vec::new());
        }
        Ok(vec![
            UnitDescription::new(locator, "memory", "First").uid("mem.first"),
            UnitDescription::new(locator, "memory", "Second").uid("mem.second"),
        ])
    }

    fn instantiate(
        &self,
        description: &UnitDescription,
        _sample_rate: f64,
        _block_size: usize,
    ) -> HostResult<Box<dyn ProcessingUnit>> {
        let gain = if description.uid == "mem.first" { 0.25 } else { 4.0 };
        Ok(Box::new(GainUnit::new(gain)))
    }
}

#[test]
fn test_custom_format_loads_first_description() {
    let (host, _) = test_host_with(
        blockhost::builder()
            .block_size(TEST_BLOCK_SIZE)
            .format(Arc::new(MemoryFormat)),
    );

    host.load("mem://bank").unwrap();
    assert_eq!(host.param(0), 0.25);
    assert_eq!(host.description().unwrap().name, "First");

    let err = host.load("mem://bank/empty").unwrap_err();
    assert!(matches!(err, HostError::NoDescriptionsFound { .. }));
    // The previous unit survives a failed load.
    assert!(host.is_loaded());

    host.load(GAIN_LOCATOR).unwrap();
    assert_eq!(host.param(0), 0.5);
}

#[test]
fn test_hosts_share_an_executor() {
    let executor = Arc::new(ControlExecutor::start().unwrap());
    let (a, _) = test_host_with(blockhost::builder().executor(Arc::clone(&executor)));
    let (b, _) = test_host_with(blockhost::builder().executor(Arc::clone(&executor)));

    a.load(GAIN_LOCATOR).unwrap();
    b.load(RECORDER_LOCATOR).unwrap();
    assert_eq!(a.name(), "Gain");
    assert_eq!(b.name(), "Recorder");

    drop(a);
    drop(b);
    assert!(executor.is_running());
    executor.shutdown();
}

#[test]
fn test_handle_chains_control_calls() {
    let (host, log) = test_host(TEST_BLOCK_SIZE);
    host.load(RECORDER_LOCATOR).unwrap();

    host.handle()
        .note_on(64, 1.0, 0)
        .control_change(74, 10, 0)
        .all_notes_off(0);
    run_ramp(&host, TEST_BLOCK_SIZE, TEST_BLOCK_SIZE);

    assert_eq!(log.lock().unwrap()[0].events.len(), 3);
    assert_eq!(host.handle().metadata().unwrap().name, "Recorder");
}
