//! Built-in stages.
//!
//! Stages are organized into three categories:
//!
//! ## Sources ([`source`])
//!
//! Yield blocks of normalized samples:
//! - [`WavSource`] - Stream a 16-bit PCM WAV file
//! - [`MemorySource`] - Play samples already in memory
//!
//! ## Effects ([`effect`])
//!
//! Process a block in place:
//! - [`Gain`] - Volume with per-block interpolation
//! - [`Equalizer`] - Bass, mid and treble bands summed with their gains
//! - [`Compressor`] - Whole-block peak compression
//!
//! ## Sinks ([`sink`])
//!
//! Consume 16-bit blocks:
//! - [`CpalSink`] - Output to system audio device (requires `cpal_sink` feature)
//! - [`RtrbSink`] - Write to a ring buffer (tests, offline capture)

pub mod source;
pub mod effect;
pub mod sink;

// Re-export common types at the top level for convenience
pub use source::{MemorySource, Normalizer, ReadStatus, SampleSource, StreamSpec, WavSource};
pub use effect::{Compressor, Equalizer, Gain};
pub use sink::{RtrbSink, Sink};

#[cfg(feature = "cpal_sink")]
pub use sink::CpalSink;
