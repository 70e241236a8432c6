//! Frame bridge between a variable-size audio callback and a fixed-block unit.
//!
//! When the callback size matches the block size the unit runs once per
//! callback with no added latency. Otherwise input frames accumulate in a
//! ring, whole blocks are processed as soon as they are available and the
//! results are drained one frame at a time from an output ring, which adds
//! `block_size - 1` frames of latency.
//!
//! Everything the tick touches lives behind one `parking_lot::Mutex` (the
//! audio lock). The tick holds it for the whole callback. The control thread
//! takes it only for short swaps, so once `install` returns no tick can still
//! be using the previous unit.

use crate::unit::SharedUnit;
use blockhost_core::{
    AudioBlock, BridgeConfig, CoreError, EventList, EventScheduler, MidiEvent, RingBuffer,
    TransportInfo, TransportState, MAX_BLOCK_EVENTS,
};
use crossbeam::queue::ArrayQueue;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Capacity of the queue holding events emitted by the unit.
pub const OUTPUT_EVENT_CAPACITY: usize = 1024;

/// Counters describing what the bridge had to drop or skip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Processed blocks that did not fit in the output ring.
    pub overflows: u64,
    /// Blocks passed through because the unit was locked by the control
    /// thread.
    pub units_busy: u64,
    /// Events refused because a full block's worth was already pending.
    pub events_dropped: u64,
    /// Bumped on every install or uninstall.
    pub generation: u64,
}

/// State owned by the audio lock.
struct RenderState {
    block_size: usize,
    input: RingBuffer,
    output: RingBuffer,
    block: AudioBlock,
    scheduler: EventScheduler,
    block_events: EventList,
    unit: Option<SharedUnit>,
}

pub struct FrameBridge {
    sample_rate: f64,
    channels: usize,
    max_block_size: usize,
    state: Mutex<RenderState>,
    block_size: AtomicUsize,
    transport: Arc<TransportState>,
    bypass: AtomicBool,
    auto_advance: AtomicBool,
    generation: AtomicU64,
    overflows: AtomicU64,
    units_busy: AtomicU64,
    events_dropped: AtomicU64,
    output_events: ArrayQueue<MidiEvent>,
}

impl FrameBridge {
    pub fn new(config: &BridgeConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let channels = config.num_channels;
        let capacity = config.ring_capacity();

        Ok(Self {
            sample_rate: config.sample_rate,
            channels,
            max_block_size: config.max_block_size,
            state: Mutex::new(RenderState {
                block_size: config.block_size,
                input: RingBuffer::new(channels, capacity),
                output: RingBuffer::new(channels, capacity),
                block: AudioBlock::new(channels, config.block_size),
                scheduler: EventScheduler::new(),
                block_events: EventList::new(),
                unit: None,
            }),
            block_size: AtomicUsize::new(config.block_size),
            transport: Arc::new(TransportState::new()),
            bypass: AtomicBool::new(false),
            auto_advance: AtomicBool::new(config.transport_auto_advance),
            generation: AtomicU64::new(0),
            overflows: AtomicU64::new(0),
            units_busy: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            output_events: ArrayQueue::new(OUTPUT_EVENT_CAPACITY),
        })
    }

    /// Process one callback.
    ///
    /// `input` and `output` are interleaved with the bridge's channel count.
    /// If either holds fewer than `nframes` frames, only the frames both hold
    /// are processed. Real-time safe: no allocation, no logging, no waiting
    /// except on the audio lock.
    pub fn tick(&self, input: &[f32], output: &mut [f32], nframes: usize) {
        let channels = self.channels;
        let nframes = nframes
            .min(input.len() / channels)
            .min(output.len() / channels);
        if nframes == 0 {
            return;
        }
        let samples = nframes * channels;

        let mut guard = self.state.lock();
        let state = &mut *guard;

        if nframes == state.block_size {
            if !state.input.is_empty() || !state.output.is_empty() {
                state.input.clear();
                state.output.clear();
            }
            state.block.deinterleave_from(&input[..samples], channels);
            self.render(state);
            state.block.interleave_into(&mut output[..samples], channels);
            return;
        }

        for (frame_in, frame_out) in input[..samples]
            .chunks_exact(channels)
            .zip(output[..samples].chunks_exact_mut(channels))
        {
            state.input.push_frame(frame_in);
            if state.input.available() >= state.block_size
                && state.input.pop_block(&mut state.block).is_ok()
            {
                self.render(state);
                if state.output.push_block(&state.block).is_err() {
                    self.overflows.fetch_add(1, Ordering::Relaxed);
                }
            }
            state.output.pop_frame(frame_out);
        }
    }

    /// Run the unit on `state.block` in place, or leave it untouched.
    #[inline]
    fn render(&self, state: &mut RenderState) {
        let block_size = state.block_size;
        state.block_events.clear();
        state
            .scheduler
            .drain_into(&mut state.block_events, block_size);

        let transport = self.transport.snapshot();
        if !self.bypass.load(Ordering::Relaxed) {
            if let Some(unit) = &state.unit {
                match unit.try_lock() {
                    Some(mut unit) => {
                        unit.process(&mut state.block, &mut state.block_events, &transport);
                        for event in state.block_events.drain(..) {
                            let _ = self.output_events.push(event);
                        }
                    }
                    None => {
                        self.units_busy.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }

        if self.auto_advance.load(Ordering::Relaxed) {
            self.transport.advance(block_size, self.sample_rate);
        }
    }

    /// Swap the active unit. Returns the previous one, which the caller drops
    /// after this returns.
    ///
    /// The new unit is prepared before the audio lock is taken.
    pub fn install(&self, unit: SharedUnit) -> Option<SharedUnit> {
        {
            let mut u = unit.lock();
            u.prepare(self.sample_rate, self.block_size());
            let (inputs, outputs) = (u.num_inputs(), u.num_outputs());
            if inputs > self.channels || outputs > self.channels {
                warn!(
                    "'{}' wants {} in / {} out, bridge runs {} channel(s); extra channels are not routed",
                    u.metadata().name,
                    inputs,
                    outputs,
                    self.channels
                );
            }
        }
        self.swap(Some(unit))
    }

    pub fn uninstall(&self) -> Option<SharedUnit> {
        self.swap(None)
    }

    fn swap(&self, unit: Option<SharedUnit>) -> Option<SharedUnit> {
        let previous = {
            let mut state = self.state.lock();
            std::mem::replace(&mut state.unit, unit)
        };
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("Unit slot swapped (generation {})", generation);
        previous
    }

    /// The installed unit, if any.
    pub fn unit(&self) -> Option<SharedUnit> {
        self.state.lock().unit.clone()
    }

    pub fn has_unit(&self) -> bool {
        self.state.lock().unit.is_some()
    }

    pub fn block_size(&self) -> usize {
        self.block_size.load(Ordering::Acquire)
    }

    /// Change the processing block size.
    ///
    /// The new block is allocated outside the audio lock. The unit stays
    /// locked from its re-prepare until the geometry swap is done, so ticks in
    /// between pass through instead of handing it a block of the old size.
    /// Both rings are cleared; pending events stay queued.
    pub fn set_block_size(&self, block_size: usize) -> Result<(), CoreError> {
        if block_size == 0 || block_size > self.max_block_size {
            return Err(CoreError::InvalidBlockSize {
                size: block_size,
                max: self.max_block_size,
            });
        }
        if block_size == self.block_size() {
            return Ok(());
        }

        let mut block = AudioBlock::new(self.channels, block_size);
        let unit = self.unit();
        {
            let mut unit_guard = unit.as_ref().map(|u| u.lock());
            if let Some(u) = unit_guard.as_mut() {
                u.prepare(self.sample_rate, block_size);
            }
            let mut state = self.state.lock();
            std::mem::swap(&mut state.block, &mut block);
            state.block_size = block_size;
            state.input.clear();
            state.output.clear();
        }
        self.block_size.store(block_size, Ordering::Release);
        debug!("Block size set to {}", block_size);
        Ok(())
    }

    /// Queue `event` for the next processed block. Returns the frame offset
    /// it was stamped with.
    ///
    /// At most [`MAX_BLOCK_EVENTS`] events can wait for one block. Past that
    /// the event is dropped, counted in `events_dropped`, and the offset it
    /// would have had is still returned.
    pub fn schedule(&self, event: MidiEvent) -> usize {
        let mut state = self.state.lock();
        let available = state.input.available();
        let block_size = state.block_size;
        let scheduled = state.scheduler.schedule(event, available, block_size);
        drop(state);
        match scheduled {
            Ok(offset) => offset,
            Err(e) => {
                self.events_dropped.fetch_add(1, Ordering::Relaxed);
                warn!("{}", e);
                available.min(block_size - 1)
            }
        }
    }

    pub fn pending_events(&self) -> usize {
        self.state.lock().scheduler.len()
    }

    /// Drop everything in flight: both rings and all pending events.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.input.clear();
        state.output.clear();
        state.scheduler.clear();
        state.block_events.clear();
    }

    /// Drain events emitted by the unit since the last call.
    pub fn take_output_events(&self) -> Vec<MidiEvent> {
        std::iter::from_fn(|| self.output_events.pop()).collect()
    }

    pub fn set_bypass(&self, bypass: bool) {
        self.bypass.store(bypass, Ordering::Relaxed);
    }

    pub fn bypass(&self) -> bool {
        self.bypass.load(Ordering::Relaxed)
    }

    pub fn set_transport_auto_advance(&self, enabled: bool) {
        self.auto_advance.store(enabled, Ordering::Relaxed);
    }

    pub fn transport_auto_advance(&self) -> bool {
        self.auto_advance.load(Ordering::Relaxed)
    }

    pub fn transport(&self) -> &Arc<TransportState> {
        &self.transport
    }

    pub fn transport_info(&self) -> TransportInfo {
        self.transport.snapshot()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> usize {
        self.channels
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            overflows: self.overflows.load(Ordering::Relaxed),
            units_busy: self.units_busy.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            generation: self.generation(),
        }
    }
}
