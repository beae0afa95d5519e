//! Output sinks.
//!
//! A sink accepts successive blocks of interleaved 16-bit samples at the
//! source's sample rate and channel count. Writes block while the output is
//! full; there is no timeout and no retry.

#[cfg(feature = "cpal_sink")]
mod cpal_sink;
mod rtrb_sink;

#[cfg(feature = "cpal_sink")]
pub use cpal_sink::CpalSink;
pub use rtrb_sink::RtrbSink;

use crate::error::Result;

/// Destination for processed audio.
pub trait Sink: Send + 'static {
    /// Write one block of interleaved samples, waiting for room if needed.
    fn write(&mut self, samples: &[i16]) -> Result<()>;

    /// Release the output. Called once when playback stops.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write(&mut self, samples: &[i16]) -> Result<()> {
        (**self).write(samples)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
