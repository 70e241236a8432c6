//! Processing unit contract.
//!
//! A unit is whatever the host runs once per block: a hosted plugin behind a
//! format adapter, or an in-process processor. The bridge owns it through
//! [`SharedUnit`] and only ever touches it from two places: the audio thread
//! (`process`) and the control thread (everything else).

use crate::metadata::UnitMetadata;
use crate::Result;
use blockhost_core::{AudioBlock, EventList, TransportInfo};
use parking_lot::Mutex;
use std::sync::Arc;

/// Unit instance shared between the audio thread and the control thread.
///
/// The audio thread only ever `try_lock`s it.
pub type SharedUnit = Arc<Mutex<Box<dyn ProcessingUnit>>>;

pub fn share(unit: Box<dyn ProcessingUnit>) -> SharedUnit {
    Arc::new(Mutex::new(unit))
}

/// Unified interface for units the bridge can drive.
pub trait ProcessingUnit: Send {
    fn metadata(&self) -> &UnitMetadata;

    /// Called on the control thread before the unit is installed, and again
    /// whenever the block size changes.
    fn prepare(&mut self, sample_rate: f64, block_size: usize);

    /// Process one block in place. `events` holds the incoming events for
    /// this block on entry; whatever it holds on return is treated as the
    /// unit's output events.
    fn process(&mut self, block: &mut AudioBlock, events: &mut EventList, transport: &TransportInfo);

    fn num_parameters(&self) -> usize;

    /// Normalized 0..1.
    fn parameter(&self, index: usize) -> f32;

    /// Normalized 0..1.
    fn set_parameter(&mut self, index: usize, value: f32);

    fn parameter_name(&self, index: usize) -> String;

    fn parameter_label(&self, _index: usize) -> String {
        String::new()
    }

    fn parameter_display(&self, index: usize) -> String {
        format!("{:.3}", self.parameter(index))
    }

    fn num_programs(&self) -> usize {
        0
    }

    fn current_program(&self) -> usize {
        0
    }

    fn set_current_program(&mut self, _index: usize) {}

    fn program_name(&self, _index: usize) -> String {
        String::new()
    }

    /// Opaque state blob. The host writes it to disk byte for byte.
    fn get_state(&mut self) -> Result<Vec<u8>>;

    fn set_state(&mut self, data: &[u8]) -> Result<()>;

    fn latency_samples(&self) -> usize {
        0
    }

    fn suspend(&mut self, _suspended: bool) {}

    fn is_suspended(&self) -> bool {
        false
    }

    fn reset(&mut self) {}

    fn num_inputs(&self) -> usize {
        self.metadata().audio_io.inputs
    }

    fn num_outputs(&self) -> usize {
        self.metadata().audio_io.outputs
    }

    fn set_non_realtime(&mut self, _non_realtime: bool) {}
}
