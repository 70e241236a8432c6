//! Audio thread and control thread running at the same time.

use crate::helpers::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Spawn a fake audio thread that ticks `callback` frames until stopped.
fn spawn_audio_thread(
    host: Arc<blockhost::UnitHost>,
    callback: usize,
    stop: Arc<AtomicBool>,
    ticks: Arc<AtomicUsize>,
) -> thread::JoinHandle<bool> {
    thread::spawn(move || {
        let input = stereo_ramp(0, callback);
        let mut output = vec![0.0; callback * 2];
        let mut all_finite = true;
        while !stop.load(Ordering::Relaxed) {
            host.tick(&input, &mut output, callback);
            all_finite &= output.iter().all(|s| s.is_finite());
            ticks.fetch_add(1, Ordering::Relaxed);
        }
        all_finite
    })
}

#[test]
fn test_swapping_units_while_ticking() {
    for callback in [TEST_BLOCK_SIZE, 7] {
        let (host, _) = test_host(TEST_BLOCK_SIZE);
        let host = Arc::new(host);
        let stop = Arc::new(AtomicBool::new(false));
        let ticks = Arc::new(AtomicUsize::new(0));
        let audio = spawn_audio_thread(
            Arc::clone(&host),
            callback,
            Arc::clone(&stop),
            Arc::clone(&ticks),
        );

        for _ in 0..30 {
            host.load(GAIN_LOCATOR).unwrap();
            host.load(RECORDER_LOCATOR).unwrap();
            host.unload().unwrap();
        }

        stop.store(true, Ordering::Relaxed);
        assert!(audio.join().unwrap());
        assert_eq!(host.stats().generation, 90);
        assert!(!host.is_loaded());
    }
}

#[test]
fn test_async_swaps_drain_in_order() {
    let (host, _) = test_host(TEST_BLOCK_SIZE);
    let host = Arc::new(host);
    host.set_force_synchronous(false);

    let stop = Arc::new(AtomicBool::new(false));
    let ticks = Arc::new(AtomicUsize::new(0));
    let audio = spawn_audio_thread(Arc::clone(&host), 5, Arc::clone(&stop), Arc::clone(&ticks));

    for _ in 0..20 {
        host.load(GAIN_LOCATOR).unwrap();
        host.set_block_size(32).unwrap();
        host.set_block_size(16).unwrap();
    }
    host.load(RECORDER_LOCATOR).unwrap();
    assert!(host.wait_for_async_events(Some(Duration::from_secs(5))));

    stop.store(true, Ordering::Relaxed);
    assert!(audio.join().unwrap());
    assert!(ticks.load(Ordering::Relaxed) > 0);
    assert_eq!(host.name(), "Recorder");
    assert_eq!(host.block_size(), 16);
}

#[test]
fn test_state_save_while_ticking() {
    let (host, _) = test_host(TEST_BLOCK_SIZE);
    host.load(GAIN_LOCATOR).unwrap();
    let host = Arc::new(host);

    let stop = Arc::new(AtomicBool::new(false));
    let ticks = Arc::new(AtomicUsize::new(0));
    let audio = spawn_audio_thread(Arc::clone(&host), 16, Arc::clone(&stop), Arc::clone(&ticks));

    let dir = tempfile::tempdir().unwrap();
    for i in 0..20 {
        let path = dir.path().join(format!("gain-{i}.state"));
        host.save_state(&path).unwrap();
        host.load_state(&path).unwrap();
    }

    stop.store(true, Ordering::Relaxed);
    assert!(audio.join().unwrap());
    assert_eq!(host.param(0), 0.5);
}
