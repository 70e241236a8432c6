use crate::bridge::FrameBridge;
use crate::metadata::{ParameterInfo, UnitMetadata};
use blockhost_core::MidiEvent;
use std::sync::Arc;

/// Control-thread handle to whatever unit the host has loaded.
/// Clone is cheap (Arc-based). Action methods return `&Self` for chaining.
///
/// The handle follows the host: after a reload it talks to the new unit.
#[derive(Clone)]
pub struct UnitHandle {
    bridge: Arc<FrameBridge>,
}

impl UnitHandle {
    pub(crate) fn new(bridge: Arc<FrameBridge>) -> Self {
        Self { bridge }
    }

    pub fn is_loaded(&self) -> bool {
        self.bridge.has_unit()
    }

    pub fn generation(&self) -> u64 {
        self.bridge.generation()
    }

    pub fn metadata(&self) -> Option<UnitMetadata> {
        let unit = self.bridge.unit()?;
        let metadata = unit.lock().metadata().clone();
        Some(metadata)
    }

    /// Snapshot of every parameter. The unit is locked once per parameter,
    /// so a long list never holds it for more than one entry.
    pub fn parameters(&self) -> Vec<ParameterInfo> {
        let Some(unit) = self.bridge.unit() else {
            return Vec::new();
        };
        let count = unit.lock().num_parameters();
        (0..count)
            .map_while(|index| {
                let unit = unit.lock();
                (index < unit.num_parameters()).then(|| ParameterInfo {
                    index,
                    name: unit.parameter_name(index),
                    label: unit.parameter_label(index),
                    value: unit.parameter(index),
                    display: unit.parameter_display(index),
                })
            })
            .collect()
    }

    pub fn get_parameter(&self, index: usize) -> Option<f32> {
        let unit = self.bridge.unit()?;
        let unit = unit.lock();
        (index < unit.num_parameters()).then(|| unit.parameter(index))
    }

    /// Value is clamped to 0..1. Out-of-range indices are ignored.
    pub fn set_parameter(&self, index: usize, value: f32) -> &Self {
        if let Some(unit) = self.bridge.unit() {
            let mut unit = unit.lock();
            if index < unit.num_parameters() {
                unit.set_parameter(index, value.clamp(0.0, 1.0));
            }
        }
        self
    }

    /// In-memory state blob of the loaded unit.
    pub fn save_state(&self) -> Option<Vec<u8>> {
        let unit = self.bridge.unit()?;
        let state = unit.lock().get_state();
        state.ok()
    }

    pub fn load_state(&self, data: &[u8]) -> &Self {
        if let Some(unit) = self.bridge.unit() {
            let _ = unit.lock().set_state(data);
        }
        self
    }

    pub fn set_bypass(&self, bypass: bool) -> &Self {
        self.bridge.set_bypass(bypass);
        self
    }

    pub fn send(&self, event: MidiEvent) -> &Self {
        self.bridge.schedule(event);
        self
    }

    /// `velocity` is 0..1, `channel` 0-based.
    pub fn note_on(&self, note: u8, velocity: f32, channel: u8) -> &Self {
        self.send(MidiEvent::note_on(
            midi_channel(channel),
            note,
            unit_to_7bit(velocity),
        ))
    }

    pub fn note_off(&self, note: u8, channel: u8) -> &Self {
        self.send(MidiEvent::note_off(midi_channel(channel), note, 0))
    }

    pub fn control_change(&self, control: u8, value: u8, channel: u8) -> &Self {
        self.send(MidiEvent::control_change(
            midi_channel(channel),
            control,
            value,
        ))
    }

    pub fn all_notes_off(&self, channel: u8) -> &Self {
        self.send(MidiEvent::all_notes_off(midi_channel(channel)))
    }
}

#[inline]
pub(crate) fn midi_channel(channel: u8) -> u8 {
    channel.min(15)
}

/// 0..1 to 0..=127.
#[inline]
pub(crate) fn unit_to_7bit(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 127.0).round() as u8
}

/// -1..1 to the 14-bit bend range, 8192 at centre.
#[inline]
pub(crate) fn bend_to_14bit(value: f32) -> u16 {
    let scaled = (value.clamp(-1.0, 1.0) + 1.0) * 8192.0;
    (scaled.round() as u16).min(0x3FFF)
}
