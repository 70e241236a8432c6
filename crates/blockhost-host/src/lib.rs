//! Fixed-block unit hosting for blockhost
//!
//! Runs one processing unit (a plugin behind a format adapter, or an
//! in-process processor) at a fixed block size while the audio callback
//! delivers whatever frame count it likes.
//!
//! ## Pieces
//!
//! - [`FrameBridge`]: fast path and accumulation path, audio lock, unit slot
//! - [`ControlExecutor`]: owned control thread, FIFO task queue
//! - [`AsyncGate`]: routes control operations onto the executor, counts them
//! - [`FormatRegistry`] / [`UnitFormat`]: locator to unit
//! - [`UnitHost`]: the control surface tying it together
//!
//! ## Usage
//!
//! ```ignore
//! use blockhost_host::{FormatRegistry, StaticFormat, UnitHost};
//! use blockhost_core::BridgeConfig;
//!
//! let format = StaticFormat::new("builtin");
//! format.register("builtin:gain", "Gain", |_| Ok(Box::new(Gain::default())));
//!
//! let host = UnitHost::new(
//!     BridgeConfig::new(48000.0).block_size(64),
//!     FormatRegistry::new().with_format(Arc::new(format)),
//! )?;
//! host.load("builtin:gain")?;
//! host.note_on(60, 0.8, 0);
//!
//! // Audio thread
//! host.tick(&input, &mut output, nframes);
//! ```

pub mod error;
pub use error::{HostError, LoadStage, Result};

mod metadata;
pub use metadata::{AudioIO, ParameterInfo, UnitDescription, UnitMetadata};

mod unit;
pub use unit::{share, ProcessingUnit, SharedUnit};

mod format;
pub use format::{FormatRegistry, StaticFormat, UnitConstructor, UnitFormat};

mod executor;
pub use executor::ControlExecutor;

mod gate;
pub use gate::{AsyncGate, Dispatched, InFlight, InFlightToken};

mod bridge;
pub use bridge::{BridgeStats, FrameBridge, OUTPUT_EVENT_CAPACITY};

mod handle;
pub use handle::UnitHandle;

mod host;
pub use host::{LoadOutcome, UnitHost};
