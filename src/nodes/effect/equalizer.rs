//! Three-band equalizer (the filter bank)

use tracing::debug;

use crate::config::EqualizerConfig;
use crate::node::{Effect, ProcessContext};
use crate::params::{BandGains, Params};

use super::biquad::{Biquad, BiquadCoeffs};

/// Filters for one channel. Each band sees the full input signal.
#[derive(Clone, Copy, Debug)]
struct ChannelBank {
    low: Biquad,
    /// Fourth-order bandpass, two sections in series
    mid: [Biquad; 2],
    high: Biquad,
}

impl ChannelBank {
    fn new(config: &EqualizerConfig, nyquist: f64) -> Self {
        Self {
            low: Biquad::new(BiquadCoeffs::lowpass(config.low_cutoff / nyquist)),
            mid: BiquadCoeffs::bandpass(config.mid_low / nyquist, config.mid_high / nyquist)
                .map(Biquad::new),
            high: Biquad::new(BiquadCoeffs::highpass(config.high_cutoff / nyquist)),
        }
    }

    #[inline]
    fn process_sample(&mut self, x: f32, gains: &BandGains) -> f32 {
        let low = self.low.process_sample(x);
        let [first, second] = &mut self.mid;
        let mid = second.process_sample(first.process_sample(x));
        let high = self.high.process_sample(x);

        low * (1.0 + gains.bass) + mid * (1.0 + gains.mid) + high * (1.0 + gains.treble)
    }

    fn reset(&mut self) {
        self.low.reset();
        self.mid.iter_mut().for_each(Biquad::reset);
        self.high.reset();
    }
}

/// Splits the signal into low/mid/high bands and sums them back with
/// per-band gain.
///
/// The bands are three parallel filtered copies of the input, not a
/// crossover network. At zero gain the sum is flat at DC and in the middle
/// of the mid band, but the overlapping skirts at the band edges do not
/// add back to unity: there is a deep notch around the 4 kHz edge where
/// the mid and high bands meet in anti-phase.
///
/// Filter memory persists across blocks and is kept per channel.
pub struct Equalizer {
    config: EqualizerConfig,
    sample_rate: u32,
    banks: Vec<ChannelBank>,
}

impl Equalizer {
    pub fn new(ctx: &ProcessContext, config: EqualizerConfig) -> Self {
        let bank = ChannelBank::new(&config, ctx.nyquist());
        Self {
            config,
            sample_rate: ctx.sample_rate,
            banks: vec![bank; ctx.channels],
        }
    }

    #[inline]
    pub fn config(&self) -> &EqualizerConfig {
        &self.config
    }

    /// Rebuild filters for a new stream layout. Clears filter memory.
    fn rebuild(&mut self, ctx: &ProcessContext) {
        debug!(
            sample_rate = ctx.sample_rate,
            channels = ctx.channels,
            "recomputing equalizer coefficients"
        );
        let bank = ChannelBank::new(&self.config, ctx.nyquist());
        self.sample_rate = ctx.sample_rate;
        self.banks = vec![bank; ctx.channels];
    }
}

impl Effect for Equalizer {
    fn process(&mut self, ctx: &ProcessContext, params: &Params, block: &mut [f32]) {
        if ctx.sample_rate != self.sample_rate || ctx.channels != self.banks.len() {
            self.rebuild(ctx);
        }

        let gains = params.gains;
        for frame in block.chunks_mut(ctx.channels) {
            for (sample, bank) in frame.iter_mut().zip(self.banks.iter_mut()) {
                *sample = bank.process_sample(*sample, &gains);
            }
        }
    }

    fn reset(&mut self) {
        self.banks.iter_mut().for_each(ChannelBank::reset);
    }
}
