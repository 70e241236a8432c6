//! Test helpers and fixtures for blockhost integration tests
//!
//! Mock units are plain in-process processors registered through the
//! builder, so every test drives the real load path.

pub mod tolerances;

use blockhost::host::Result as HostResult;
use blockhost::prelude::*;
use blockhost::HostError;
use std::sync::{Arc, Mutex};

pub const TEST_SAMPLE_RATE: f64 = 48000.0;

/// Matches the original default processing block.
pub const TEST_BLOCK_SIZE: usize = 16;

pub const GAIN_LOCATOR: &str = "builtin:gain";
pub const RECORDER_LOCATOR: &str = "builtin:recorder";

/// Install a fmt subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Multiplies every sample by parameter 0. State is the gain as 4 LE bytes.
pub struct GainUnit {
    meta: UnitMetadata,
    gain: f32,
}

impl GainUnit {
    pub fn new(gain: f32) -> Self {
        Self {
            meta: UnitMetadata::new("test.gain", "Gain").vendor("blockhost tests"),
            gain,
        }
    }
}

impl ProcessingUnit for GainUnit {
    fn metadata(&self) -> &UnitMetadata {
        &self.meta
    }

    fn prepare(&mut self, _sample_rate: f64, _block_size: usize) {}

    fn process(&mut self, block: &mut AudioBlock, events: &mut EventList, _: &TransportInfo) {
        for channel in block.channels_mut() {
            for sample in channel.iter_mut() {
                *sample *= self.gain;
            }
        }
        events.clear();
    }

    fn num_parameters(&self) -> usize {
        1
    }

    fn parameter(&self, _index: usize) -> f32 {
        self.gain
    }

    fn set_parameter(&mut self, _index: usize, value: f32) {
        self.gain = value;
    }

    fn parameter_name(&self, _index: usize) -> String {
        "Gain".to_string()
    }

    fn get_state(&mut self) -> HostResult<Vec<u8>> {
        Ok(self.gain.to_le_bytes().to_vec())
    }

    fn set_state(&mut self, data: &[u8]) -> HostResult<()> {
        let bytes: [u8; 4] = data
            .try_into()
            .map_err(|_| HostError::InvalidState(format!("expected 4 bytes, got {}", data.len())))?;
        self.gain = f32::from_le_bytes(bytes);
        Ok(())
    }
}

/// What a [`RecorderUnit`] saw in one `process` call.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub frames: usize,
    pub events: Vec<MidiEvent>,
    pub transport: TransportInfo,
}

pub type RecordLog = Arc<Mutex<Vec<Recorded>>>;

/// Passes audio through and records every block's events and transport.
/// Emits each incoming note-on back out, transposed up an octave.
pub struct RecorderUnit {
    meta: UnitMetadata,
    log: RecordLog,
}

impl RecorderUnit {
    pub fn new(log: RecordLog) -> Self {
        Self {
            meta: UnitMetadata::new("test.recorder", "Recorder").midi(true, true),
            log,
        }
    }
}

impl ProcessingUnit for RecorderUnit {
    fn metadata(&self) -> &UnitMetadata {
        &self.meta
    }

    fn prepare(&mut self, _sample_rate: f64, _block_size: usize) {}

    fn process(&mut self, block: &mut AudioBlock, events: &mut EventList, transport: &TransportInfo) {
        self.log.lock().unwrap().push(Recorded {
            frames: block.num_frames(),
            events: events.to_vec(),
            transport: *transport,
        });

        let echoes: Vec<MidiEvent> = events
            .iter()
            .filter(|e| e.is_note_on())
            .map(|e| {
                MidiEvent::note_on(e.channel(), e.data[1].saturating_add(12), e.data[2])
                    .with_offset(e.frame_offset)
            })
            .collect();
        events.clear();
        events.extend(echoes);
    }

    fn num_parameters(&self) -> usize {
        0
    }

    fn parameter(&self, _index: usize) -> f32 {
        0.0
    }

    fn set_parameter(&mut self, _index: usize, _value: f32) {}

    fn parameter_name(&self, _index: usize) -> String {
        String::new()
    }

    fn get_state(&mut self) -> HostResult<Vec<u8>> {
        Ok(Vec::new())
    }

    fn set_state(&mut self, _data: &[u8]) -> HostResult<()> {
        Ok(())
    }
}

/// Host with the gain and recorder units registered.
pub fn test_host(block_size: usize) -> (UnitHost, RecordLog) {
    test_host_with(blockhost::builder().block_size(block_size))
}

pub fn test_host_with(builder: UnitHostBuilder) -> (UnitHost, RecordLog) {
    init_tracing();
    let log: RecordLog = Arc::new(Mutex::new(Vec::new()));
    let recorder_log = Arc::clone(&log);
    let host = builder
        .sample_rate(TEST_SAMPLE_RATE)
        .unit(GAIN_LOCATOR, "Gain", |_| Ok(Box::new(GainUnit::new(0.5))))
        .unit(RECORDER_LOCATOR, "Recorder", move |_| {
            Ok(Box::new(RecorderUnit::new(Arc::clone(&recorder_log))))
        })
        .build()
        .expect("Failed to create test host");
    (host, log)
}

/// Stereo ramp: left = frame index, right = negated frame index.
pub fn stereo_ramp(start: usize, frames: usize) -> Vec<f32> {
    (start..start + frames)
        .flat_map(|i| [i as f32, -(i as f32)])
        .collect()
}

/// Feed `total` ramp frames through the host in callbacks of `callback`
/// frames and return the concatenated output.
pub fn run_ramp(host: &UnitHost, total: usize, callback: usize) -> Vec<f32> {
    run_ramp_sizes(host, total, &[callback])
}

/// Like [`run_ramp`], cycling through `callbacks` for the callback sizes.
pub fn run_ramp_sizes(host: &UnitHost, total: usize, callbacks: &[usize]) -> Vec<f32> {
    let mut out = Vec::with_capacity(total * 2);
    let mut pos = 0;
    for &size in callbacks.iter().cycle() {
        if pos >= total {
            break;
        }
        let n = size.min(total - pos);
        let input = stereo_ramp(pos, n);
        let mut output = vec![0.0; n * 2];
        host.tick(&input, &mut output, n);
        out.extend_from_slice(&output);
        pos += n;
    }
    out
}

/// Left channel of an interleaved stereo buffer.
pub fn left(interleaved: &[f32]) -> Vec<f32> {
    interleaved.iter().step_by(2).copied().collect()
}
