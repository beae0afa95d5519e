//! Sample sources.
//!
//! A source yields fixed-size blocks of normalized samples. The
//! normalization divisor (the global peak) is computed once, by a pre-pass
//! over the whole backing store, before the first block is read.

mod memory;
mod wav;

pub use memory::MemorySource;
pub use wav::WavSource;

use crate::error::Result;

/// Stream layout reported by a source
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamSpec {
    pub sample_rate: u32,
    pub channels: u16,
    /// Total frames in the backing store
    pub total_frames: u64,
}

impl StreamSpec {
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        self.total_frames as f64 / self.sample_rate.max(1) as f64
    }
}

/// Outcome of a block read
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadStatus {
    /// This many samples (a whole number of frames) were written
    Samples(usize),
    EndOfStream,
}

/// Converts between stored integer samples and normalized floats using the
/// source's global peak amplitude.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Normalizer {
    peak: f32,
}

impl Normalizer {
    /// A peak of 0 (all-silent source) normalizes with a divisor of 1.
    pub fn from_peak(peak: u32) -> Self {
        Self {
            peak: peak.max(1) as f32,
        }
    }

    /// Peak of a sample sequence
    pub fn scan(samples: impl IntoIterator<Item = i16>) -> Self {
        let peak = samples
            .into_iter()
            .map(|s| s.unsigned_abs() as u32)
            .max()
            .unwrap_or(0);
        Self::from_peak(peak)
    }

    #[inline]
    pub fn peak(&self) -> f32 {
        self.peak
    }

    #[inline]
    pub fn normalize(&self, sample: i16) -> f32 {
        sample as f32 / self.peak
    }

    /// Back to integer scale, rounded and saturated to the i16 range.
    #[inline]
    pub fn denormalize(&self, sample: f32) -> i16 {
        // float -> int `as` saturates
        (sample * self.peak).round() as i16
    }
}

/// A stream of normalized samples.
///
/// Opening a source does the peak pre-pass; after that reads only move
/// forward.
pub trait SampleSource: Send + 'static {
    fn spec(&self) -> StreamSpec;

    fn normalizer(&self) -> Normalizer;

    /// Fill `block` with the next samples.
    ///
    /// `block.len()` must be a multiple of the channel count. Fewer samples
    /// than requested are returned only at the tail of the stream. End of
    /// stream is reported as [`ReadStatus::EndOfStream`], never as an error.
    fn next_block(&mut self, block: &mut [f32]) -> Result<ReadStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_samples_stay_in_unit_range() {
        let samples = [0i16, 1200, -32768, 32767, -5];
        let norm = Normalizer::scan(samples);
        assert_eq!(norm.peak(), 32768.0);
        assert!(samples
            .iter()
            .map(|&s| norm.normalize(s))
            .all(|x| (-1.0..=1.0).contains(&x)));
        assert_eq!(norm.normalize(-32768), -1.0);
    }

    #[test]
    fn denormalize_inverts_normalize() {
        for peak in [1u32, 977, 32767, 32768] {
            let norm = Normalizer::from_peak(peak);
            let limit = peak.min(32767) as i32;
            for s in (-limit..=limit).step_by(7) {
                let s = s as i16;
                assert_eq!(norm.denormalize(norm.normalize(s)), s, "peak {}", peak);
            }
        }
    }

    #[test]
    fn silent_source_does_not_divide_by_zero() {
        let norm = Normalizer::scan([0i16; 16]);
        assert_eq!(norm.peak(), 1.0);
        assert_eq!(norm.normalize(0), 0.0);
    }

    #[test]
    fn denormalize_saturates() {
        let norm = Normalizer::from_peak(32767);
        assert_eq!(norm.denormalize(3.0), i16::MAX);
        assert_eq!(norm.denormalize(-3.0), i16::MIN);
    }
}
