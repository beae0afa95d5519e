//! Core processing trait and context types.

use crate::params::Params;

/// Information available during block processing.
///
/// Fixed for the life of a session: the sample rate and channel count come
/// from the source and never change once streaming starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProcessContext {
    /// Sample rate of the stream in Hz (e.g., 44100, 48000)
    pub sample_rate: u32,
    /// Interleaved channel count
    pub channels: usize,
    /// Raw interleaved samples per block (always a whole number of frames)
    pub block_size: usize,
}

impl ProcessContext {
    /// Build a context, rounding `block_size` down to whole frames.
    pub fn new(sample_rate: u32, channels: usize, block_size: usize) -> Self {
        let channels = channels.max(1);
        let frames = (block_size / channels).max(1);
        Self {
            sample_rate,
            channels,
            block_size: frames * channels,
        }
    }

    /// Nyquist frequency in Hz
    #[inline]
    pub fn nyquist(&self) -> f64 {
        0.5 * self.sample_rate as f64
    }
}

/// A processing stage of the effects chain.
///
/// Stages work in place on a block of normalized, interleaved samples. The
/// parameter snapshot is taken once per block by the playback path, so every
/// stage of one block sees the same values.
///
/// Stages may keep state between blocks (filter memory, smoothed gain). That
/// state belongs to the stream and is only cleared by [`Effect::reset`].
pub trait Effect: Send + 'static {
    /// Process one block in place.
    ///
    /// `block.len()` is a multiple of `ctx.channels`; the last block of a
    /// stream may be shorter than `ctx.block_size`.
    fn process(&mut self, ctx: &ProcessContext, params: &Params, block: &mut [f32]);

    /// Clear any state carried between blocks.
    fn reset(&mut self) {}
}
