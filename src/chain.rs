//! The effects chain: volume, then equalizer, then compressor.

use crate::config::EngineConfig;
use crate::node::{Effect, ProcessContext};
use crate::nodes::effect::{Compressor, Equalizer, Gain};
use crate::params::Params;

/// Runs a block through every stage in a fixed order.
///
/// Compression comes last so that equalizer boosts are still subject to
/// peak limiting.
pub struct EffectsChain {
    gain: Gain,
    equalizer: Equalizer,
    compressor: Compressor,
}

impl EffectsChain {
    pub fn new(ctx: &ProcessContext, config: &EngineConfig) -> Self {
        Self {
            gain: Gain::new(config.initial.volume),
            equalizer: Equalizer::new(ctx, config.equalizer),
            compressor: Compressor::new(),
        }
    }

    #[inline]
    pub fn compressor(&self) -> &Compressor {
        &self.compressor
    }

    #[inline]
    pub fn equalizer(&self) -> &Equalizer {
        &self.equalizer
    }
}

impl Effect for EffectsChain {
    fn process(&mut self, ctx: &ProcessContext, params: &Params, block: &mut [f32]) {
        self.gain.process(ctx, params, block);
        self.equalizer.process(ctx, params, block);
        self.compressor.process(ctx, params, block);
    }

    fn reset(&mut self) {
        self.gain.reset();
        self.equalizer.reset();
        self.compressor.reset();
    }
}
