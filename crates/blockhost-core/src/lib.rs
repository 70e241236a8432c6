//! Real-time building blocks for fixed-block audio hosting.
//!
//! # Primary API
//!
//! - [`RingBuffer`]: multi-channel circular store that accumulates callback
//!   frames into processing blocks
//! - [`AudioBlock`]: planar block handed to a processing unit
//! - [`TransportState`] / [`TransportInfo`]: advisory playhead, relaxed atomics
//! - [`EventScheduler`] / [`MidiEvent`]: sample-accurate events, one block at a time
//! - [`BridgeConfig`]: sample rate, channel count and block geometry
//!
//! Nothing in this crate locks or logs. Everything that touches the audio
//! thread is allocation-free once constructed.

pub mod error;
pub use error::{CoreError, Result};

mod config;
pub use config::{BridgeConfig, DEFAULT_BLOCK_SIZE, DEFAULT_MAX_BLOCK_SIZE, MAX_CHANNELS};

mod block;
pub use block::AudioBlock;

mod ring_buffer;
pub use ring_buffer::RingBuffer;

mod transport;
pub use transport::{TransportInfo, TransportState};

mod event;
pub use event::{EventList, EventScheduler, MidiEvent, MAX_BLOCK_EVENTS};

pub(crate) mod lockfree;
pub use lockfree::{AtomicDouble, AtomicFlag, AtomicInt, AtomicLong};

pub use midi_msg;
