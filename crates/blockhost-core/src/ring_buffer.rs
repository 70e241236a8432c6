//! Per-channel circular sample store used to accumulate frames into blocks.

use crate::block::AudioBlock;
use crate::{CoreError, Result};

/// Multi-channel ring buffer with independent read/write cursors.
///
/// Capacity is one slot larger than the largest usable span, so
/// `available() <= capacity() - 1` always holds and a full buffer never looks
/// empty. Single-frame pushes are unchecked; block pushes and block pops are
/// all-or-nothing.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    channels: Vec<Vec<f32>>,
    capacity: usize,
    write_index: usize,
    read_index: usize,
}

impl RingBuffer {
    /// `capacity` is clamped to at least 2 (one usable slot).
    pub fn new(num_channels: usize, capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            channels: vec![vec![0.0; capacity]; num_channels],
            capacity,
            write_index: 0,
            read_index: 0,
        }
    }

    /// Reallocate storage. Contents are discarded.
    pub fn resize(&mut self, num_channels: usize, capacity: usize) {
        *self = Self::new(num_channels, capacity);
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn available(&self) -> usize {
        (self.write_index + self.capacity - self.read_index) % self.capacity
    }

    #[inline]
    pub fn free_space(&self) -> usize {
        self.capacity - 1 - self.available()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.write_index == self.read_index
    }

    /// Cursor positions as `(write, read)`.
    #[inline]
    pub fn cursors(&self) -> (usize, usize) {
        (self.write_index, self.read_index)
    }

    /// Reset both cursors and zero the storage.
    pub fn clear(&mut self) {
        for ch in &mut self.channels {
            ch.fill(0.0);
        }
        self.write_index = 0;
        self.read_index = 0;
    }

    /// Write one frame and advance the write cursor.
    ///
    /// There is no overflow check: the caller drains the buffer at the rate it
    /// fills it. Channels past the buffer's count are ignored; missing ones
    /// are written as silence.
    #[inline]
    pub fn push_frame(&mut self, frame: &[f32]) {
        let idx = self.write_index;
        for (ch, buf) in self.channels.iter_mut().enumerate() {
            buf[idx] = frame.get(ch).copied().unwrap_or(0.0);
        }
        self.write_index = (idx + 1) % self.capacity;
    }

    /// Pop one frame. An empty buffer yields silence and leaves the cursors
    /// untouched.
    #[inline]
    pub fn pop_frame(&mut self, frame: &mut [f32]) {
        if self.is_empty() {
            frame.fill(0.0);
            return;
        }
        let idx = self.read_index;
        for (ch, out) in frame.iter_mut().enumerate() {
            *out = self.channels.get(ch).map_or(0.0, |buf| buf[idx]);
        }
        self.read_index = (idx + 1) % self.capacity;
    }

    /// Write a whole block, or nothing.
    ///
    /// When the block does not fit, it is rejected entirely and the buffer is
    /// left exactly as it was.
    pub fn push_block(&mut self, block: &AudioBlock) -> Result<()> {
        let frames = block.num_frames();
        let free = self.free_space();
        if free < frames {
            return Err(CoreError::Overflow {
                requested: frames,
                free,
            });
        }

        let start = self.write_index;
        for (ch, buf) in self.channels.iter_mut().enumerate() {
            if ch < block.num_channels() {
                copy_into_ring(buf, start, block.channel(ch));
            } else {
                fill_ring(buf, start, frames);
            }
        }
        self.write_index = (start + frames) % self.capacity;
        Ok(())
    }

    /// Fill `block` with the oldest `block.num_frames()` frames, or fail
    /// without touching anything.
    pub fn pop_block(&mut self, block: &mut AudioBlock) -> Result<()> {
        let frames = block.num_frames();
        let available = self.available();
        if available < frames {
            return Err(CoreError::NotReady {
                requested: frames,
                available,
            });
        }

        let start = self.read_index;
        for ch in 0..block.num_channels() {
            let dest = block.channel_mut(ch);
            match self.channels.get(ch) {
                Some(buf) => copy_from_ring(buf, start, dest),
                None => dest.fill(0.0),
            }
        }
        self.read_index = (start + frames) % self.capacity;
        Ok(())
    }
}

#[inline]
fn copy_into_ring(buf: &mut [f32], start: usize, src: &[f32]) {
    let first = src.len().min(buf.len() - start);
    buf[start..start + first].copy_from_slice(&src[..first]);
    buf[..src.len() - first].copy_from_slice(&src[first..]);
}

#[inline]
fn fill_ring(buf: &mut [f32], start: usize, len: usize) {
    let first = len.min(buf.len() - start);
    buf[start..start + first].fill(0.0);
    buf[..len - first].fill(0.0);
}

#[inline]
fn copy_from_ring(buf: &[f32], start: usize, dest: &mut [f32]) {
    let first = dest.len().min(buf.len() - start);
    dest[..first].copy_from_slice(&buf[start..start + first]);
    let rest = dest.len() - first;
    dest[first..].copy_from_slice(&buf[..rest]);
}
