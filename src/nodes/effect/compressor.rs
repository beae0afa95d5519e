//! Whole-block peak compressor

use crate::node::{Effect, ProcessContext};
use crate::params::Params;

/// Peak absolute amplitude of a block
#[inline]
pub fn peak(block: &[f32]) -> f32 {
    block.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

/// Scales a whole block down when its peak exceeds the threshold.
///
/// No attack/release envelope: the decision is made per block from that
/// block's peak, and the gain reduction is exactly `1 / ratio`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Compressor {
    /// Blocks that were reduced since creation
    compressed_blocks: u64,
}

impl Compressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Linear gain applied to a block over threshold
    #[inline]
    pub fn reduction_gain(ratio: f32) -> f32 {
        let compression = 1.0 - 1.0 / ratio.max(1.0);
        1.0 - compression
    }

    #[inline]
    pub fn compressed_blocks(&self) -> u64 {
        self.compressed_blocks
    }
}

impl Effect for Compressor {
    fn process(&mut self, _ctx: &ProcessContext, params: &Params, block: &mut [f32]) {
        // silent blocks compare 0 against the threshold, no division by the peak
        if peak(block) <= params.compression_threshold {
            return;
        }

        let gain = Self::reduction_gain(params.compression_ratio);
        block.iter_mut().for_each(|s| *s *= gain);
        self.compressed_blocks += 1;
    }
}
