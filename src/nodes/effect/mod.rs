//! Processing stages: volume, equalizer, compressor

mod biquad;
mod compressor;
mod equalizer;
mod gain;

pub use biquad::{Biquad, BiquadCoeffs};
pub use compressor::{peak, Compressor};
pub use equalizer::Equalizer;
pub use gain::Gain;
