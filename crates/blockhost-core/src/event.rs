//! Sample-accurate MIDI events and the per-block scheduler.

use crate::error::{CoreError, Result};
use midi_msg::{Channel, ChannelModeMsg, ChannelVoiceMsg, ControlChange, MidiMsg};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

const EVENT_STACK_CAPACITY: usize = 256;

/// Most events one block can carry. Fits the inline storage of an
/// [`EventList`], so filling one never touches the heap.
pub const MAX_BLOCK_EVENTS: usize = EVENT_STACK_CAPACITY;

/// Event list handed to a processing unit for one block.
pub type EventList = SmallVec<[MidiEvent; EVENT_STACK_CAPACITY]>;

/// Raw MIDI event (1-3 bytes) with a frame offset into the current block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiEvent {
    /// Offset within the current block (0 = first frame).
    pub frame_offset: usize,
    pub data: [u8; 3],
    /// Valid bytes in `data` (1-3).
    pub len: u8,
}

impl MidiEvent {
    pub fn from_bytes(frame_offset: usize, bytes: &[u8]) -> Self {
        let mut data = [0u8; 3];
        let len = bytes.len().min(3);
        data[..len].copy_from_slice(&bytes[..len]);
        Self {
            frame_offset,
            data,
            len: len as u8,
        }
    }

    pub fn from_midi_msg(frame_offset: usize, msg: &MidiMsg) -> Self {
        Self::from_bytes(frame_offset, &msg.to_midi())
    }

    fn voice(channel: u8, msg: ChannelVoiceMsg) -> Self {
        Self::from_midi_msg(
            0,
            &MidiMsg::ChannelVoice {
                channel: Channel::from_u8(channel & 0x0F),
                msg,
            },
        )
    }

    /// `channel` is 0-based (0..=15).
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::voice(
            channel,
            ChannelVoiceMsg::NoteOn {
                note: note & 0x7F,
                velocity: velocity & 0x7F,
            },
        )
    }

    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Self::voice(
            channel,
            ChannelVoiceMsg::NoteOff {
                note: note & 0x7F,
                velocity: velocity & 0x7F,
            },
        )
    }

    pub fn control_change(channel: u8, control: u8, value: u8) -> Self {
        Self::voice(
            channel,
            ChannelVoiceMsg::ControlChange {
                control: ControlChange::CC {
                    control: control & 0x7F,
                    value: value & 0x7F,
                },
            },
        )
    }

    /// 14-bit bend, 8192 is centre.
    pub fn pitch_bend(channel: u8, bend: u16) -> Self {
        Self::voice(
            channel,
            ChannelVoiceMsg::PitchBend {
                bend: bend.min(0x3FFF),
            },
        )
    }

    pub fn poly_aftertouch(channel: u8, note: u8, pressure: u8) -> Self {
        Self::voice(
            channel,
            ChannelVoiceMsg::PolyPressure {
                note: note & 0x7F,
                pressure: pressure & 0x7F,
            },
        )
    }

    pub fn channel_aftertouch(channel: u8, pressure: u8) -> Self {
        Self::voice(
            channel,
            ChannelVoiceMsg::ChannelPressure {
                pressure: pressure & 0x7F,
            },
        )
    }

    pub fn program_change(channel: u8, program: u8) -> Self {
        Self::voice(
            channel,
            ChannelVoiceMsg::ProgramChange {
                program: program & 0x7F,
            },
        )
    }

    pub fn all_notes_off(channel: u8) -> Self {
        Self::from_midi_msg(
            0,
            &MidiMsg::ChannelMode {
                channel: Channel::from_u8(channel & 0x0F),
                msg: ChannelModeMsg::AllNotesOff,
            },
        )
    }

    pub fn with_offset(mut self, frame_offset: usize) -> Self {
        self.frame_offset = frame_offset;
        self
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    #[inline]
    pub fn status(&self) -> u8 {
        self.data[0] & 0xF0
    }

    #[inline]
    pub fn channel(&self) -> u8 {
        self.data[0] & 0x0F
    }

    /// Parse the bytes back into a structured message.
    pub fn decode(&self) -> Option<MidiMsg> {
        MidiMsg::from_midi(self.as_bytes()).ok().map(|(msg, _)| msg)
    }

    #[inline]
    pub fn is_note_on(&self) -> bool {
        self.status() == 0x90 && self.len == 3 && self.data[2] > 0
    }

    #[inline]
    pub fn is_note_off(&self) -> bool {
        self.status() == 0x80 || (self.status() == 0x90 && self.data[2] == 0)
    }
}

/// Collects events between block flushes and stamps them into the next
/// block.
///
/// Offsets are fixed when an event is scheduled: the number of frames
/// already accumulated for the coming block, clamped to the block. Nothing
/// carries over past a flush.
#[derive(Debug, Default)]
pub struct EventScheduler {
    pending: EventList,
}

impl EventScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `event` for the next block and return the offset it was given.
    ///
    /// Fails with `EventQueueFull` once [`MAX_BLOCK_EVENTS`] are pending; the
    /// event is not queued.
    pub fn schedule(
        &mut self,
        event: MidiEvent,
        available_in: usize,
        block_size: usize,
    ) -> Result<usize> {
        if self.pending.len() >= MAX_BLOCK_EVENTS {
            return Err(CoreError::EventQueueFull {
                capacity: MAX_BLOCK_EVENTS,
            });
        }
        let offset = clamp_offset(available_in, block_size);
        self.pending.push(event.with_offset(offset));
        Ok(offset)
    }

    /// Append pending events, in schedule order, to `events` and clear the
    /// pending list.
    ///
    /// Never grows `events`: pending events that do not fit in its spare
    /// capacity are dropped.
    pub fn drain_into(&mut self, events: &mut EventList, block_size: usize) {
        let room = events.capacity() - events.len();
        for event in self.pending.drain(..).take(room) {
            let offset = clamp_offset(event.frame_offset, block_size);
            events.push(event.with_offset(offset));
        }
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> &[MidiEvent] {
        &self.pending
    }
}

#[inline]
fn clamp_offset(offset: usize, block_size: usize) -> usize {
    offset.min(block_size.saturating_sub(1))
}
