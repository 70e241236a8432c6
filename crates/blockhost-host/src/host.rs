//! The control surface: one hosted unit behind a frame bridge.
//!
//! The audio thread calls [`UnitHost::tick`]. Everything else is called from
//! the embedder's control side. Operations that change what is loaded or
//! touch unit state (load, unload, state files, programs, block size, reset)
//! go through the async gate and run on the host's control thread.

use crate::bridge::{BridgeStats, FrameBridge};
use crate::error::{HostError, Result};
use crate::executor::ControlExecutor;
use crate::format::FormatRegistry;
use crate::gate::{AsyncGate, Dispatched};
use crate::handle::{bend_to_14bit, midi_channel, unit_to_7bit, UnitHandle};
use crate::metadata::UnitDescription;
use crate::unit::{share, ProcessingUnit};
use arc_swap::ArcSwapOption;
use blockhost_core::{BridgeConfig, MidiEvent, TransportState};
use crossbeam_channel::Receiver;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// What the most recent load attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded {
        locator: String,
        description: UnitDescription,
        generation: u64,
    },
    Failed {
        locator: String,
        error: String,
    },
}

impl LoadOutcome {
    pub fn locator(&self) -> &str {
        match self {
            LoadOutcome::Loaded { locator, .. } | LoadOutcome::Failed { locator, .. } => locator,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }
}

/// State shared with operations running on the control thread.
struct HostInner {
    config: BridgeConfig,
    bridge: Arc<FrameBridge>,
    formats: FormatRegistry,
    last_load: ArcSwapOption<LoadOutcome>,
    description: ArcSwapOption<UnitDescription>,
    realtime: AtomicBool,
}

impl HostInner {
    fn load_now(&self, locator: &str) -> Result<()> {
        info!("Loading unit: {}", locator);
        let loaded = self
            .formats
            .instantiate(locator, self.config.sample_rate, self.bridge.block_size());

        let (description, mut unit) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                self.last_load.store(Some(Arc::new(LoadOutcome::Failed {
                    locator: locator.to_string(),
                    error: e.to_string(),
                })));
                return Err(e);
            }
        };

        unit.set_non_realtime(!self.realtime.load(Ordering::Acquire));
        let name = unit.metadata().name.clone();
        let previous = self.bridge.install(share(unit));
        drop(previous);

        info!("Loaded '{}' from {}", name, locator);
        self.description.store(Some(Arc::new(description.clone())));
        self.last_load.store(Some(Arc::new(LoadOutcome::Loaded {
            locator: locator.to_string(),
            description,
            generation: self.bridge.generation(),
        })));
        Ok(())
    }

    fn unload_now(&self) -> Result<()> {
        match self.bridge.uninstall() {
            Some(previous) => {
                let name = previous.lock().metadata().name.clone();
                drop(previous);
                self.description.store(None);
                info!("Unloaded '{}'", name);
            }
            None => debug!("Unload requested with no unit loaded"),
        }
        Ok(())
    }

    fn save_state_now(&self, path: &Path) -> Result<()> {
        let unit = self.bridge.unit().ok_or(HostError::NoUnitLoaded)?;
        let state_error = |reason: String| HostError::StateSaveError {
            path: path.to_path_buf(),
            reason,
        };

        let data = unit.lock().get_state().map_err(|e| state_error(e.to_string()))?;
        std::fs::write(path, &data).map_err(|e| state_error(e.to_string()))?;
        info!("Saved {} bytes of unit state to {}", data.len(), path.display());
        Ok(())
    }

    fn load_state_now(&self, path: &Path) -> Result<()> {
        let unit = self.bridge.unit().ok_or(HostError::NoUnitLoaded)?;
        let state_error = |reason: String| HostError::StateRestoreError {
            path: path.to_path_buf(),
            reason,
        };

        let data = std::fs::read(path).map_err(|e| state_error(e.to_string()))?;
        unit.lock()
            .set_state(&data)
            .map_err(|e| state_error(e.to_string()))?;
        info!("Restored {} bytes of unit state from {}", data.len(), path.display());
        Ok(())
    }

    fn with_unit<R>(&self, f: impl FnOnce(&mut dyn ProcessingUnit) -> R) -> Option<R> {
        let unit = self.bridge.unit()?;
        let mut guard = unit.lock();
        Some(f(&mut **guard))
    }
}

/// Hosts one processing unit on a fixed block size.
///
/// Parameter, program and state calls lock the unit for as long as the unit
/// takes to answer. A block that comes due in that window is passed through
/// unprocessed and counted in [`BridgeStats::units_busy`], so polling
/// parameters from a UI at a high rate can be heard as dry blocks. Poll
/// sparingly, or cache values on the control side.
///
/// # Example
/// ```ignore
/// let format = StaticFormat::new("builtin");
/// format.register("builtin:gain", "Gain", |_| Ok(Box::new(Gain::default())));
/// let host = UnitHost::new(
///     BridgeConfig::new(48000.0).block_size(32),
///     FormatRegistry::new().with_format(Arc::new(format)),
/// )?;
/// host.load("builtin:gain")?;
///
/// // audio callback
/// host.tick(&input, &mut output, nframes);
/// ```
pub struct UnitHost {
    inner: Arc<HostInner>,
    gate: AsyncGate,
}

impl UnitHost {
    /// Create a host with its own control thread.
    pub fn new(config: BridgeConfig, formats: FormatRegistry) -> Result<Self> {
        let executor = Arc::new(ControlExecutor::start()?);
        Self::with_executor(config, formats, executor)
    }

    /// Create a host that runs its control operations on `executor`.
    pub fn with_executor(
        config: BridgeConfig,
        formats: FormatRegistry,
        executor: Arc<ControlExecutor>,
    ) -> Result<Self> {
        let bridge = Arc::new(FrameBridge::new(&config)?);
        info!(
            "Unit host ready: {} Hz, {} channel(s), block size {}",
            config.sample_rate, config.num_channels, config.block_size
        );

        let gate = AsyncGate::new(executor, config.force_synchronous);
        Ok(Self {
            inner: Arc::new(HostInner {
                config,
                bridge,
                formats,
                last_load: ArcSwapOption::empty(),
                description: ArcSwapOption::empty(),
                realtime: AtomicBool::new(true),
            }),
            gate,
        })
    }

    /// Audio callback. Interleaved buffers, `nframes` frames each.
    #[inline]
    pub fn tick(&self, input: &[f32], output: &mut [f32], nframes: usize) {
        self.inner.bridge.tick(input, output, nframes);
    }

    /// Run `op` on the control thread through the gate. Errors from queued
    /// operations are logged.
    fn run_control<F>(&self, what: &'static str, op: F) -> Result<()>
    where
        F: FnOnce(&HostInner) -> Result<()> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let outcome = self.gate.dispatch(move || {
            let result = op(&inner);
            if let Err(e) = &result {
                error!("{} failed: {}", what, e);
            }
            result
        })?;
        match outcome {
            Dispatched::Completed(result) => result,
            Dispatched::Queued => Ok(()),
        }
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Load the first unit found at `locator`, replacing the current one.
    ///
    /// A failed load leaves the current unit in place. With force-synchronous
    /// off this returns immediately; see [`UnitHost::last_load`].
    pub fn load(&self, locator: impl Into<String>) -> Result<()> {
        let locator = locator.into();
        self.run_control("load", move |inner| inner.load_now(&locator))
    }

    pub fn unload(&self) -> Result<()> {
        self.run_control("unload", |inner| inner.unload_now())
    }

    pub fn last_load(&self) -> Option<Arc<LoadOutcome>> {
        self.inner.last_load.load_full()
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.bridge.has_unit()
    }

    pub fn description(&self) -> Option<Arc<UnitDescription>> {
        self.inner.description.load_full()
    }

    /// Empty when nothing is loaded.
    pub fn name(&self) -> String {
        self.inner
            .with_unit(|u| u.metadata().name.clone())
            .unwrap_or_default()
    }

    pub fn vendor(&self) -> String {
        self.inner
            .with_unit(|u| u.metadata().vendor.clone())
            .unwrap_or_default()
    }

    // ---------------------------------------------------------------------
    // Processing configuration
    // ---------------------------------------------------------------------

    pub fn sample_rate(&self) -> f64 {
        self.inner.config.sample_rate
    }

    pub fn num_channels(&self) -> usize {
        self.inner.config.num_channels
    }

    pub fn block_size(&self) -> usize {
        self.inner.bridge.block_size()
    }

    /// Must be in `1..=max_block_size`; checked before dispatch.
    pub fn set_block_size(&self, block_size: usize) -> Result<()> {
        self.inner.config.check_block_size(block_size)?;
        self.run_control("set_block_size", move |inner| {
            inner.bridge.set_block_size(block_size)?;
            Ok(())
        })
    }

    /// Latency reported by the unit. Does not include the accumulation
    /// delay of `block_size - 1` frames, which only applies when the
    /// callback size differs from the block size.
    pub fn latency(&self) -> usize {
        self.inner
            .with_unit(|u| u.latency_samples())
            .unwrap_or(0)
    }

    pub fn set_bypass(&self, bypass: bool) {
        self.inner.bridge.set_bypass(bypass);
    }

    pub fn bypass(&self) -> bool {
        self.inner.bridge.bypass()
    }

    /// Clear the bridge pipeline and reset the unit.
    pub fn reset(&self) -> Result<()> {
        self.run_control("reset", |inner| {
            inner.bridge.reset();
            inner.with_unit(|u| u.reset());
            Ok(())
        })
    }

    pub fn num_inputs(&self) -> usize {
        self.inner.with_unit(|u| u.num_inputs()).unwrap_or(0)
    }

    pub fn num_outputs(&self) -> usize {
        self.inner.with_unit(|u| u.num_outputs()).unwrap_or(0)
    }

    pub fn set_realtime(&self, realtime: bool) {
        self.inner.realtime.store(realtime, Ordering::Release);
        self.inner.with_unit(|u| u.set_non_realtime(!realtime));
    }

    pub fn is_realtime(&self) -> bool {
        self.inner.realtime.load(Ordering::Acquire)
    }

    // ---------------------------------------------------------------------
    // Parameters
    // ---------------------------------------------------------------------

    pub fn num_params(&self) -> usize {
        self.inner.with_unit(|u| u.num_parameters()).unwrap_or(0)
    }

    /// Empty for an unknown index or when nothing is loaded.
    pub fn param_name(&self, index: usize) -> String {
        self.inner
            .with_unit(|u| (index < u.num_parameters()).then(|| u.parameter_name(index)))
            .flatten()
            .unwrap_or_default()
    }

    /// Normalized 0..1. Zero for an unknown index.
    pub fn param(&self, index: usize) -> f32 {
        self.inner
            .with_unit(|u| (index < u.num_parameters()).then(|| u.parameter(index)))
            .flatten()
            .unwrap_or(0.0)
    }

    /// Set a normalized parameter and return the value the unit now
    /// reports. Zero when the index is unknown or nothing is loaded.
    pub fn set_param(&self, index: usize, value: f32) -> f32 {
        self.inner
            .with_unit(|u| {
                (index < u.num_parameters()).then(|| {
                    u.set_parameter(index, value.clamp(0.0, 1.0));
                    u.parameter(index)
                })
            })
            .flatten()
            .unwrap_or(0.0)
    }

    /// Index of the parameter called `name`. Exact match first, then
    /// case-insensitive.
    pub fn find_param(&self, name: &str) -> Option<usize> {
        let names: Vec<String> = self
            .inner
            .with_unit(|u| (0..u.num_parameters()).map(|i| u.parameter_name(i)).collect())
            .unwrap_or_default();
        names
            .iter()
            .position(|n| n == name)
            .or_else(|| names.iter().position(|n| n.eq_ignore_ascii_case(name)))
    }

    pub fn param_label(&self, index: usize) -> String {
        self.inner
            .with_unit(|u| (index < u.num_parameters()).then(|| u.parameter_label(index)))
            .flatten()
            .unwrap_or_default()
    }

    pub fn param_display(&self, index: usize) -> String {
        self.inner
            .with_unit(|u| (index < u.num_parameters()).then(|| u.parameter_display(index)))
            .flatten()
            .unwrap_or_default()
    }

    // ---------------------------------------------------------------------
    // Programs
    // ---------------------------------------------------------------------

    pub fn num_programs(&self) -> usize {
        self.inner.with_unit(|u| u.num_programs()).unwrap_or(0)
    }

    pub fn current_program(&self) -> usize {
        self.inner.with_unit(|u| u.current_program()).unwrap_or(0)
    }

    /// Out-of-range indices are ignored.
    pub fn set_current_program(&self, index: usize) -> Result<()> {
        self.run_control("set_current_program", move |inner| {
            inner
                .with_unit(|u| {
                    if index < u.num_programs() {
                        u.set_current_program(index);
                    }
                })
                .ok_or(HostError::NoUnitLoaded)
        })
    }

    pub fn program_name(&self, index: usize) -> String {
        self.inner
            .with_unit(|u| (index < u.num_programs()).then(|| u.program_name(index)))
            .flatten()
            .unwrap_or_default()
    }

    // ---------------------------------------------------------------------
    // State
    // ---------------------------------------------------------------------

    /// Write the unit's state blob to `path`, byte for byte.
    pub fn save_state(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        self.run_control("save_state", move |inner| inner.save_state_now(&path))
    }

    /// Hand the bytes at `path` to the unit as its state.
    pub fn load_state(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        self.run_control("load_state", move |inner| inner.load_state_now(&path))
    }

    // ---------------------------------------------------------------------
    // Async operations
    // ---------------------------------------------------------------------

    pub fn async_event_running(&self) -> bool {
        self.gate.async_event_running()
    }

    /// `None` waits indefinitely. Returns `false` on timeout.
    pub fn wait_for_async_events(&self, timeout: Option<Duration>) -> bool {
        self.gate.wait_for_async_events(timeout)
    }

    pub fn set_force_synchronous(&self, force: bool) {
        self.gate.set_force_synchronous(force);
    }

    pub fn force_synchronous(&self) -> bool {
        self.gate.force_synchronous()
    }

    /// Receives a message whenever the last in-flight operation finishes.
    pub fn subscribe_idle(&self) -> Receiver<()> {
        self.gate.subscribe_idle()
    }

    // ---------------------------------------------------------------------
    // Transport
    // ---------------------------------------------------------------------

    pub fn transport(&self) -> &Arc<TransportState> {
        self.inner.bridge.transport()
    }

    pub fn set_transport_auto_advance(&self, enabled: bool) {
        self.inner.bridge.set_transport_auto_advance(enabled);
    }

    // ---------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------

    /// Queue an event for the next processed block. Returns its frame offset.
    pub fn schedule_event(&self, event: MidiEvent) -> usize {
        self.inner.bridge.schedule(event)
    }

    /// `velocity` is 0..1. Channels are 0-based.
    pub fn note_on(&self, note: u8, velocity: f32, channel: u8) -> usize {
        self.schedule_event(MidiEvent::note_on(
            midi_channel(channel),
            note,
            unit_to_7bit(velocity),
        ))
    }

    pub fn note_off(&self, note: u8, channel: u8) -> usize {
        self.schedule_event(MidiEvent::note_off(midi_channel(channel), note, 0))
    }

    pub fn all_notes_off(&self, channel: u8) -> usize {
        self.schedule_event(MidiEvent::all_notes_off(midi_channel(channel)))
    }

    /// `value` is -1..1, 0 is centre.
    pub fn pitch_bend(&self, value: f32, channel: u8) -> usize {
        self.schedule_event(MidiEvent::pitch_bend(
            midi_channel(channel),
            bend_to_14bit(value),
        ))
    }

    /// Polyphonic aftertouch, `pressure` 0..1.
    pub fn aftertouch(&self, note: u8, pressure: f32, channel: u8) -> usize {
        self.schedule_event(MidiEvent::poly_aftertouch(
            midi_channel(channel),
            note,
            unit_to_7bit(pressure),
        ))
    }

    pub fn channel_aftertouch(&self, pressure: f32, channel: u8) -> usize {
        self.schedule_event(MidiEvent::channel_aftertouch(
            midi_channel(channel),
            unit_to_7bit(pressure),
        ))
    }

    pub fn control_change(&self, control: u8, value: u8, channel: u8) -> usize {
        self.schedule_event(MidiEvent::control_change(
            midi_channel(channel),
            control,
            value,
        ))
    }

    /// Raw three-byte message.
    pub fn midi_msg(&self, byte1: u8, byte2: u8, byte3: u8) -> usize {
        self.schedule_event(MidiEvent::from_bytes(0, &[byte1, byte2, byte3]))
    }

    /// Drain the events the unit emitted since the last call.
    pub fn take_output_events(&self) -> Vec<MidiEvent> {
        self.inner.bridge.take_output_events()
    }

    // ---------------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------------

    pub fn stats(&self) -> BridgeStats {
        self.inner.bridge.stats()
    }

    pub fn handle(&self) -> UnitHandle {
        UnitHandle::new(Arc::clone(&self.inner.bridge))
    }
}

impl Drop for UnitHost {
    fn drop(&mut self) {
        // Tear the unit down on the control thread it was built on.
        if let Some(unit) = self.inner.bridge.uninstall() {
            let executor = self.gate.executor();
            if !executor.is_current_thread() {
                let _ = executor.submit(move || drop(unit));
            }
        }
    }
}
