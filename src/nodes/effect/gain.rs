//! Volume stage

use crate::node::{Effect, ProcessContext};
use crate::params::Params;

/// Scales a block by the snapshot's volume.
///
/// When volume changed since the previous block, the gain is interpolated
/// linearly across the block's frames so a ramp step never lands as a jump
/// at a block boundary. With a steady volume this is a plain multiply.
#[derive(Clone, Copy, Debug)]
pub struct Gain {
    /// Gain reached at the end of the previous block
    last: f32,
    smoothing: bool,
}

impl Gain {
    pub fn new(initial: f32) -> Self {
        Self {
            last: initial,
            smoothing: true,
        }
    }

    /// Apply each block's volume as a constant (no in-block interpolation)
    pub fn without_smoothing(mut self) -> Self {
        self.smoothing = false;
        self
    }

    #[inline]
    pub fn gain(&self) -> f32 {
        self.last
    }
}

impl Effect for Gain {
    fn process(&mut self, ctx: &ProcessContext, params: &Params, block: &mut [f32]) {
        let target = params.volume.clamp(0.0, 1.0);
        let start = self.last;
        self.last = target;

        if !self.smoothing || start == target {
            block.iter_mut().for_each(|s| *s *= target);
            return;
        }

        let frames = block.len() / ctx.channels;
        if frames == 0 {
            return;
        }
        let step = (target - start) / frames as f32;
        for (i, frame) in block.chunks_mut(ctx.channels).enumerate() {
            let gain = start + step * (i + 1) as f32;
            frame.iter_mut().for_each(|s| *s *= gain);
        }
    }
}
