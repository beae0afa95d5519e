//! Engine configuration

use crate::params::{Params, VolumeRamp};
use crate::nodes::source::StreamSpec;

/// Band edges of the equalizer, in Hz
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EqualizerConfig {
    /// Lowpass cutoff of the bass band
    pub low_cutoff: f64,
    /// Lower edge of the mid band
    pub mid_low: f64,
    /// Upper edge of the mid band
    pub mid_high: f64,
    /// Highpass cutoff of the treble band
    pub high_cutoff: f64,
}

impl Default for EqualizerConfig {
    fn default() -> Self {
        Self {
            low_cutoff: 100.0,
            mid_low: 250.0,
            mid_high: 4000.0,
            high_cutoff: 4000.0,
        }
    }
}

/// Output stream settings
#[derive(Clone, Debug, PartialEq)]
pub struct SinkConfig {
    pub channels: u16,
    pub sample_rate: u32,
    /// Device buffer size in frames, or `None` for the device default
    pub buffer_frames: Option<u32>,
}

impl SinkConfig {
    pub fn new(channels: u16, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
            buffer_frames: Some(EngineConfig::DEFAULT_SINK_BUFFER_FRAMES),
        }
    }

    /// Sink settings matching a source's layout
    pub fn for_stream(spec: &StreamSpec, buffer_frames: Option<u32>) -> Self {
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            buffer_frames,
        }
    }

    pub fn with_buffer_frames(mut self, frames: Option<u32>) -> Self {
        self.buffer_frames = frames;
        self
    }
}

/// Settings for one playback session.
///
/// ```
/// use klangkette::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_block_size(4096)
///     .with_ramp_step(0.02);
/// assert_eq!(config.block_size, 4096);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Raw interleaved samples read per block
    pub block_size: usize,
    /// Device buffer size in frames (`None` = device default)
    pub sink_buffer_frames: Option<u32>,
    /// Volume change per block while ramping
    pub ramp_step: f32,
    /// Parameter updates that may be pending between two blocks
    pub message_queue_size: usize,
    pub equalizer: EqualizerConfig,
    /// Parameters at session start
    pub initial: Params,
}

impl EngineConfig {
    pub const DEFAULT_BLOCK_SIZE: usize = 8192;
    pub const DEFAULT_SINK_BUFFER_FRAMES: u32 = 2048;
    pub const DEFAULT_RAMP_STEP: f32 = 0.01;
    pub const DEFAULT_QUEUE_SIZE: usize = 64;

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    pub fn with_sink_buffer_frames(mut self, frames: Option<u32>) -> Self {
        self.sink_buffer_frames = frames;
        self
    }

    /// Non-finite steps become 0 (volume changes apply immediately).
    pub fn with_ramp_step(mut self, step: f32) -> Self {
        self.ramp_step = VolumeRamp::sanitize_step(step);
        self
    }

    pub fn with_message_queue_size(mut self, size: usize) -> Self {
        self.message_queue_size = size.max(1);
        self
    }

    pub fn with_equalizer(mut self, equalizer: EqualizerConfig) -> Self {
        self.equalizer = equalizer;
        self
    }

    pub fn with_initial(mut self, initial: Params) -> Self {
        self.initial = initial;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            block_size: Self::DEFAULT_BLOCK_SIZE,
            sink_buffer_frames: Some(Self::DEFAULT_SINK_BUFFER_FRAMES),
            ramp_step: Self::DEFAULT_RAMP_STEP,
            message_queue_size: Self::DEFAULT_QUEUE_SIZE,
            equalizer: EqualizerConfig::default(),
            initial: Params::default(),
        }
    }
}
