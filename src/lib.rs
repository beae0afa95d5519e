//! Klangkette - streaming audio effects chain with live parameter control
//!
//! A session reads 16-bit PCM in fixed-size blocks, runs each block through
//! volume, a three-band equalizer and a peak compressor, and writes the
//! result to an output sink. An operator adjusts parameters while it plays.
//!
//! Design principles:
//! - One playback thread per session; it never waits on the control path
//! - Parameters arrive as messages on a ring buffer, drained between blocks
//! - Every block sees one consistent parameter snapshot
//! - Volume changes ramp by a fixed step per block, never jump
//! - Sinks are a trait; CPAL devices are discoverable (`cpal_sink` feature)
//!
//! ```no_run
//! use klangkette::{ControlLoop, EngineConfig, Session, WavSource};
//! # #[cfg(feature = "cpal_sink")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use klangkette::{CpalDevice, SinkConfig};
//!
//! let source = WavSource::open("song.wav")?;
//! let config = EngineConfig::default();
//! let device = CpalDevice::default_output().ok_or("no output device")?;
//! let sink = device.open_sink(&SinkConfig::for_stream(&source.spec(), config.sink_buffer_frames))?;
//!
//! let (session, params) = Session::start(source, sink, &config)?;
//! let mut control = ControlLoop::new(params, session.stop_signal());
//! control.handle_line("volume 0.3")?;
//! session.wait()?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "cpal_sink"))]
//! # fn main() {}
//! ```

mod chain;
mod config;
mod control;
mod engine;
mod error;
mod node;
mod playback;
pub mod nodes;
pub mod params;

#[cfg(feature = "cpal_sink")]
mod device;

pub use chain::EffectsChain;
pub use config::{EngineConfig, EqualizerConfig, SinkConfig};
pub use control::{stdin_lines, Command, ControlLoop, Flow, HELP};
pub use engine::Session;
pub use error::{CommandError, EngineError, Result};
pub use node::{Effect, ProcessContext};
pub use params::{Band, BandGains, ParamHandle, ParamMessage, ParamStore, Params, VolumeRamp};
pub use playback::{BlockInfo, PlaybackLoop, PlaybackReport, PlaybackState, StopReason, StopSignal};
pub use nodes::{MemorySource, ReadStatus, RtrbSink, SampleSource, Sink, StreamSpec, WavSource};

#[cfg(feature = "cpal_sink")]
pub use device::CpalDevice;
#[cfg(feature = "cpal_sink")]
pub use nodes::CpalSink;
