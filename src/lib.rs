//! # blockhost - Fixed-block audio unit hosting
//!
//! Runs a processing unit that wants a fixed block size inside an audio
//! callback that delivers any number of frames.
//!
//! ## Architecture
//!
//! blockhost is an umbrella crate that coordinates:
//! - **blockhost-core** - Real-time primitives (RingBuffer, TransportState, EventScheduler)
//! - **blockhost-host** - Unit hosting (FrameBridge, ControlExecutor, AsyncGate, UnitHost)
//!
//! ## Quick Start
//!
//! ```ignore
//! use blockhost::prelude::*;
//!
//! let host = blockhost::builder()
//!     .sample_rate(48000.0)
//!     .block_size(16)
//!     .unit("builtin:gain", "Gain", |_| Ok(Box::new(Gain::default())))
//!     .build()?;
//!
//! host.load("builtin:gain")?;
//! host.transport().set_playing(true);
//! host.note_on(60, 0.8, 0);
//!
//! // Audio callback, any frame count
//! host.tick(&input, &mut output, nframes);
//! ```
//!
//! ## Timing
//!
//! When the callback size equals the block size the unit runs once per
//! callback with no added latency. Otherwise the bridge accumulates and adds
//! `block_size - 1` frames of latency.

/// Re-export of blockhost-core for direct access
pub use blockhost_core as core;

/// Re-export of blockhost-host for direct access
pub use blockhost_host as host;

// Core types
pub use blockhost_core::{
    // Lock-free primitives
    AtomicDouble,
    AtomicFlag,
    AtomicInt,
    AtomicLong,

    // Buffers
    AudioBlock,
    RingBuffer,

    // Configuration
    BridgeConfig,
    CoreError,
    DEFAULT_BLOCK_SIZE,
    DEFAULT_MAX_BLOCK_SIZE,
    MAX_CHANNELS,

    // Events
    EventList,
    EventScheduler,
    MidiEvent,
    MAX_BLOCK_EVENTS,

    // Transport
    TransportInfo,
    TransportState,
};

// Hosting
pub use blockhost_host::{
    AsyncGate, AudioIO, BridgeStats, ControlExecutor, Dispatched, FormatRegistry, FrameBridge,
    HostError, InFlight, InFlightToken, LoadOutcome, LoadStage, ParameterInfo, ProcessingUnit, SharedUnit,
    StaticFormat, UnitDescription, UnitFormat, UnitHandle, UnitHost, UnitMetadata,
};

pub use blockhost_core::midi_msg;

mod error;
pub use error::{Error, Result};

mod builder;
pub use builder::{UnitHostBuilder, BUILTIN_FORMAT};

/// Start configuring a [`UnitHost`].
pub fn builder() -> UnitHostBuilder {
    UnitHostBuilder::new()
}

/// Convenience prelude for common imports
pub mod prelude {
    // Host
    pub use crate::{UnitHost, UnitHostBuilder};

    // Unit contract
    pub use crate::{ProcessingUnit, UnitDescription, UnitMetadata};

    // Essential types
    pub use crate::{AudioBlock, BridgeConfig, EventList, MidiEvent, TransportInfo};

    // Formats
    pub use crate::{FormatRegistry, StaticFormat, UnitFormat};
}
