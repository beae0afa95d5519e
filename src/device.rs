//! CPAL device discovery and sink creation.
//!
//! This module provides [`CpalDevice`] for finding an output device and
//! opening a [`CpalSink`] on it at the source's sample rate and channel
//! count.
//!
//! # Example: List and Select a Device
//!
//! ```no_run
//! use klangkette::{CpalDevice, SinkConfig};
//!
//! for device in CpalDevice::list_outputs() {
//!     println!("{} ({} Hz, {} ch)", device.name(), device.sample_rate(), device.channels());
//! }
//!
//! let device = CpalDevice::default_output().unwrap();
//! let sink = device.open_sink(&SinkConfig::new(2, 44100)).unwrap();
//! ```

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{SampleFormat, SampleRate, SupportedBufferSize};
use tracing::{debug, warn};

use crate::config::SinkConfig;
use crate::error::{EngineError, Result};
use crate::nodes::sink::CpalSink;

/// A discovered audio output device.
pub struct CpalDevice {
    device: cpal::Device,
    name: String,
    sample_rate: u32,
    channels: u16,
}

impl CpalDevice {
    fn from_device(device: cpal::Device) -> Option<Self> {
        let config = device.default_output_config().ok()?;
        let name = device.name().unwrap_or_else(|_| "Unknown".into());
        Some(Self {
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
            name,
            device,
        })
    }

    /// Get the system's default output device.
    ///
    /// Returns `None` if no audio device is available.
    pub fn default_output() -> Option<Self> {
        let host = cpal::default_host();
        Self::from_device(host.default_output_device()?)
    }

    /// List all available audio output devices.
    ///
    /// Returns an empty list if no devices are found or if enumeration fails.
    pub fn list_outputs() -> Vec<Self> {
        let host = cpal::default_host();
        host.output_devices()
            .map(|devices| devices.filter_map(Self::from_device).collect())
            .unwrap_or_default()
    }

    /// Find an output device by exact name.
    pub fn by_name(name: &str) -> Option<Self> {
        Self::list_outputs().into_iter().find(|d| d.name == name)
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the device's default sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the device's default number of output channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Open an output stream matching `config`.
    ///
    /// Fails with [`EngineError::SinkUnavailable`] if the device can't play
    /// the requested channel count at the requested rate. A fixed buffer
    /// size the device doesn't support falls back to the device default.
    pub fn open_sink(&self, config: &SinkConfig) -> Result<CpalSink> {
        let rate = SampleRate(config.sample_rate);
        let ranges: Vec<_> = self
            .device
            .supported_output_configs()
            .map_err(|e| EngineError::SinkUnavailable(e.to_string()))?
            .filter(|r| {
                r.channels() == config.channels
                    && r.min_sample_rate() <= rate
                    && rate <= r.max_sample_rate()
            })
            .collect();

        // prefer a format that needs no conversion from i16
        let range = [SampleFormat::I16, SampleFormat::F32]
            .iter()
            .find_map(|fmt| ranges.iter().find(|r| r.sample_format() == *fmt))
            .or_else(|| ranges.first())
            .ok_or_else(|| {
                EngineError::SinkUnavailable(format!(
                    "{} cannot play {} ch at {} Hz",
                    self.name, config.channels, config.sample_rate
                ))
            })?;

        let mut config = config.clone();
        if let Some(frames) = config.buffer_frames {
            let supported = match range.buffer_size() {
                SupportedBufferSize::Range { min, max } => (*min..=*max).contains(&frames),
                SupportedBufferSize::Unknown => false,
            };
            if !supported {
                warn!(frames, device = %self.name, "fixed buffer size unsupported, using device default");
                config.buffer_frames = None;
            }
        }

        debug!(device = %self.name, format = ?range.sample_format(), "opening output");
        CpalSink::open(&self.device, range.sample_format(), &config)
    }
}
