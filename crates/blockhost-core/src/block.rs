//! Non-interleaved multi-channel sample block.

/// Fixed-geometry block of planar `f32` samples.
///
/// This is the buffer handed to a processing unit. Its geometry only changes
/// through [`AudioBlock::new`]; every other method works in place and never
/// allocates.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    channels: Vec<Vec<f32>>,
    num_frames: usize,
}

impl AudioBlock {
    pub fn new(num_channels: usize, num_frames: usize) -> Self {
        Self {
            channels: vec![vec![0.0; num_frames]; num_channels],
            num_frames,
        }
    }

    /// Build a block from planar channel data. Channels are truncated or
    /// zero-padded to the length of the shortest one.
    pub fn from_channels(channels: Vec<Vec<f32>>) -> Self {
        let num_frames = channels.iter().map(Vec::len).min().unwrap_or(0);
        let channels = channels
            .into_iter()
            .map(|mut ch| {
                ch.truncate(num_frames);
                ch
            })
            .collect();
        Self {
            channels,
            num_frames,
        }
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    #[inline]
    pub fn channel(&self, channel: usize) -> &[f32] {
        &self.channels[channel]
    }

    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self.channels[channel]
    }

    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.channels.iter_mut().map(Vec::as_mut_slice)
    }

    #[inline]
    pub fn sample(&self, channel: usize, frame: usize) -> f32 {
        self.channels[channel][frame]
    }

    #[inline]
    pub fn set_sample(&mut self, channel: usize, frame: usize, value: f32) {
        self.channels[channel][frame] = value;
    }

    pub fn clear(&mut self) {
        for ch in &mut self.channels {
            ch.fill(0.0);
        }
    }

    /// Copy `num_frames` interleaved frames into the block. Interleaved
    /// channels beyond the block's count are skipped, block channels beyond
    /// `interleaved_channels` are zeroed.
    pub fn deinterleave_from(&mut self, interleaved: &[f32], interleaved_channels: usize) {
        if interleaved_channels == 0 {
            self.clear();
            return;
        }
        let frames = self
            .num_frames
            .min(interleaved.len() / interleaved_channels);
        for (ch, dest) in self.channels.iter_mut().enumerate() {
            if ch >= interleaved_channels {
                dest.fill(0.0);
                continue;
            }
            for (i, sample) in dest[..frames].iter_mut().enumerate() {
                *sample = interleaved[i * interleaved_channels + ch];
            }
            dest[frames..].fill(0.0);
        }
    }

    /// Write the block into an interleaved buffer. Output channels the block
    /// does not have are written as silence.
    pub fn interleave_into(&self, interleaved: &mut [f32], interleaved_channels: usize) {
        if interleaved_channels == 0 {
            return;
        }
        let frames = self
            .num_frames
            .min(interleaved.len() / interleaved_channels);
        for (i, frame) in interleaved
            .chunks_exact_mut(interleaved_channels)
            .take(frames)
            .enumerate()
        {
            for (ch, out) in frame.iter_mut().enumerate() {
                *out = self.channels.get(ch).map_or(0.0, |c| c[i]);
            }
        }
    }
}
