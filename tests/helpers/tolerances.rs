//! Tolerance constants for audio testing.

/// Floating point rounding errors (for passthrough, exact gain).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Transport positions accumulate one block at a time.
pub const POSITION_EPSILON: f64 = 1e-9;
