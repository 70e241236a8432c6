//! Bridge configuration.

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Largest channel count a bridge can be built with.
pub const MAX_CHANNELS: usize = 8;

/// Default processing block size.
pub const DEFAULT_BLOCK_SIZE: usize = 16;

/// Default upper bound for the processing block size. Ring buffers are sized
/// to hold one block of this many frames.
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 256;

/// Configuration for a frame bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub sample_rate: f64,
    /// Fixed channel count of the callback stream. Units wanting more
    /// channels are run with this many.
    pub num_channels: usize,
    pub block_size: usize,
    pub max_block_size: usize,
    /// Control operations block the caller until they finish.
    pub force_synchronous: bool,
    /// Advance the transport by one block after every processed block while
    /// playing.
    pub transport_auto_advance: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            num_channels: 2,
            block_size: DEFAULT_BLOCK_SIZE,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            force_synchronous: true,
            transport_auto_advance: false,
        }
    }
}

impl BridgeConfig {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    pub fn channels(mut self, num_channels: usize) -> Self {
        self.num_channels = num_channels;
        self
    }

    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn max_block_size(mut self, max_block_size: usize) -> Self {
        self.max_block_size = max_block_size;
        self
    }

    pub fn force_synchronous(mut self, force: bool) -> Self {
        self.force_synchronous = force;
        self
    }

    pub fn transport_auto_advance(mut self, enabled: bool) -> Self {
        self.transport_auto_advance = enabled;
        self
    }

    /// Ring capacity: one slot more than the largest block, so a full ring
    /// can be told apart from an empty one.
    pub fn ring_capacity(&self) -> usize {
        self.max_block_size + 1
    }

    pub fn validate(&self) -> Result<()> {
        if !(8000.0..=384000.0).contains(&self.sample_rate) {
            return Err(CoreError::InvalidConfig(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        if self.num_channels == 0 || self.num_channels > MAX_CHANNELS {
            return Err(CoreError::InvalidConfig(format!(
                "num_channels {} out of range (1-{})",
                self.num_channels, MAX_CHANNELS
            )));
        }
        if self.max_block_size == 0 {
            return Err(CoreError::InvalidConfig(
                "max_block_size must be > 0".to_string(),
            ));
        }
        self.check_block_size(self.block_size)
    }

    pub fn check_block_size(&self, block_size: usize) -> Result<()> {
        if block_size == 0 || block_size > self.max_block_size {
            return Err(CoreError::InvalidBlockSize {
                size: block_size,
                max: self.max_block_size,
            });
        }
        Ok(())
    }
}
