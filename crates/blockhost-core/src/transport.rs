//! Advisory playhead shared between the control surface and the audio thread.
//!
//! Every field is its own relaxed atomic. A reader can see a mix of old and
//! new values across fields; the processing unit only uses this as context.

use crate::lockfree::{AtomicDouble, AtomicFlag, AtomicInt, AtomicLong};
use serde::{Deserialize, Serialize};

/// Plain copy of the transport, taken once per processed block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportInfo {
    pub playing: bool,
    pub recording: bool,
    pub looping: bool,
    pub tempo: f64,
    pub time_sig_numerator: i32,
    pub time_sig_denominator: i32,
    pub position_samples: i64,
    pub position_seconds: f64,
    pub position_quarters: f64,
    pub bar_position_quarters: f64,
    pub loop_start_quarters: f64,
    pub loop_end_quarters: f64,
}

impl Default for TransportInfo {
    fn default() -> Self {
        Self {
            playing: false,
            recording: false,
            looping: false,
            tempo: 120.0,
            time_sig_numerator: 4,
            time_sig_denominator: 4,
            position_samples: 0,
            position_seconds: 0.0,
            position_quarters: 0.0,
            bar_position_quarters: 0.0,
            loop_start_quarters: 0.0,
            loop_end_quarters: 0.0,
        }
    }
}

/// Lock-free transport fields.
#[derive(Debug)]
pub struct TransportState {
    tempo: AtomicDouble,
    numerator: AtomicInt,
    denominator: AtomicInt,
    playing: AtomicFlag,
    recording: AtomicFlag,
    ppq_position: AtomicDouble,
    ppq_last_bar_start: AtomicDouble,
    time_in_seconds: AtomicDouble,
    time_in_samples: AtomicLong,
    looping: AtomicFlag,
    loop_start: AtomicDouble,
    loop_end: AtomicDouble,
}

impl Default for TransportState {
    fn default() -> Self {
        Self::from_info(&TransportInfo::default())
    }
}

impl TransportState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_info(info: &TransportInfo) -> Self {
        Self {
            tempo: AtomicDouble::new(info.tempo),
            numerator: AtomicInt::new(info.time_sig_numerator),
            denominator: AtomicInt::new(info.time_sig_denominator),
            playing: AtomicFlag::new(info.playing),
            recording: AtomicFlag::new(info.recording),
            ppq_position: AtomicDouble::new(info.position_quarters),
            ppq_last_bar_start: AtomicDouble::new(info.bar_position_quarters),
            time_in_seconds: AtomicDouble::new(info.position_seconds),
            time_in_samples: AtomicLong::new(info.position_samples),
            looping: AtomicFlag::new(info.looping),
            loop_start: AtomicDouble::new(info.loop_start_quarters),
            loop_end: AtomicDouble::new(info.loop_end_quarters),
        }
    }

    /// Read every field once. Fields are not captured atomically together.
    pub fn snapshot(&self) -> TransportInfo {
        TransportInfo {
            playing: self.playing.get(),
            recording: self.recording.get(),
            looping: self.looping.get(),
            tempo: self.tempo.get(),
            time_sig_numerator: self.numerator.get(),
            time_sig_denominator: self.denominator.get(),
            position_samples: self.time_in_samples.get(),
            position_seconds: self.time_in_seconds.get(),
            position_quarters: self.ppq_position.get(),
            bar_position_quarters: self.ppq_last_bar_start.get(),
            loop_start_quarters: self.loop_start.get(),
            loop_end_quarters: self.loop_end.get(),
        }
    }

    /// Move the playhead forward by `frames` at `sample_rate`, keeping the
    /// sample, second and quarter-note positions in step. No-op while
    /// stopped. Wraps the quarter position back into the loop when looping.
    pub fn advance(&self, frames: usize, sample_rate: f64) {
        if !self.playing.get() || sample_rate <= 0.0 {
            return;
        }
        let seconds = frames as f64 / sample_rate;
        self.time_in_samples.add(frames as i64);
        self.time_in_seconds.add(seconds);

        let quarters = seconds * self.tempo.get() / 60.0;
        let mut position = self.ppq_position.get() + quarters;
        if self.looping.get() {
            let (start, end) = (self.loop_start.get(), self.loop_end.get());
            if end > start && position >= end {
                position = start + (position - start) % (end - start);
            }
        }
        self.ppq_position.set(position);

        let numerator = self.numerator.get().max(1) as f64;
        let denominator = self.denominator.get().max(1) as f64;
        let bar_quarters = numerator * 4.0 / denominator;
        self.ppq_last_bar_start
            .set((position / bar_quarters).floor() * bar_quarters);
    }

    pub fn tempo(&self) -> f64 {
        self.tempo.get()
    }

    pub fn set_tempo(&self, bpm: f64) {
        self.tempo.set(bpm);
    }

    pub fn time_signature(&self) -> (i32, i32) {
        (self.numerator.get(), self.denominator.get())
    }

    /// Two independent stores; a reader may see one without the other.
    pub fn set_time_signature(&self, numerator: i32, denominator: i32) {
        self.numerator.set(numerator);
        self.denominator.set(denominator);
    }

    pub fn position(&self) -> f64 {
        self.ppq_position.get()
    }

    pub fn set_position(&self, quarters: f64) {
        self.ppq_position.set(quarters);
    }

    pub fn last_bar_position(&self) -> f64 {
        self.ppq_last_bar_start.get()
    }

    pub fn set_last_bar_position(&self, quarters: f64) {
        self.ppq_last_bar_start.set(quarters);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.get()
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.set(playing);
    }

    pub fn is_recording(&self) -> bool {
        self.recording.get()
    }

    pub fn set_recording(&self, recording: bool) {
        self.recording.set(recording);
    }

    pub fn time_in_samples(&self) -> i64 {
        self.time_in_samples.get()
    }

    pub fn set_time_in_samples(&self, samples: i64) {
        self.time_in_samples.set(samples);
    }

    pub fn time_in_seconds(&self) -> f64 {
        self.time_in_seconds.get()
    }

    pub fn set_time_in_seconds(&self, seconds: f64) {
        self.time_in_seconds.set(seconds);
    }

    pub fn is_looping(&self) -> bool {
        self.looping.get()
    }

    pub fn set_looping(&self, looping: bool) {
        self.looping.set(looping);
    }

    /// Two independent stores; a reader may see one without the other.
    pub fn set_loop_points(&self, start: f64, end: f64) {
        self.loop_start.set(start);
        self.loop_end.set(end);
    }

    pub fn loop_start(&self) -> f64 {
        self.loop_start.get()
    }

    pub fn set_loop_start(&self, quarters: f64) {
        self.loop_start.set(quarters);
    }

    pub fn loop_end(&self) -> f64 {
        self.loop_end.get()
    }

    pub fn set_loop_end(&self, quarters: f64) {
        self.loop_end.set(quarters);
    }
}
