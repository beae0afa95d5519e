//! In-memory PCM source

use crate::error::Result;

use super::{Normalizer, ReadStatus, SampleSource, StreamSpec};

/// Plays interleaved 16-bit samples held in memory.
pub struct MemorySource {
    samples: Vec<i16>,
    spec: StreamSpec,
    normalizer: Normalizer,
    position: usize,
}

impl MemorySource {
    /// Create a source from interleaved samples.
    ///
    /// A trailing partial frame is dropped.
    pub fn new(mut samples: Vec<i16>, channels: u16, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        samples.truncate(samples.len() - samples.len() % channels as usize);
        let normalizer = Normalizer::scan(samples.iter().copied());

        Self {
            spec: StreamSpec {
                sample_rate,
                channels,
                total_frames: (samples.len() / channels as usize) as u64,
            },
            samples,
            normalizer,
            position: 0,
        }
    }

    /// `secs` seconds of digital silence
    pub fn silence(secs: f64, channels: u16, sample_rate: u32) -> Self {
        let frames = (secs * sample_rate as f64).round() as usize;
        Self::new(vec![0; frames * channels.max(1) as usize], channels, sample_rate)
    }

    /// Samples handed out so far
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }
}

impl SampleSource for MemorySource {
    fn spec(&self) -> StreamSpec {
        self.spec
    }

    fn normalizer(&self) -> Normalizer {
        self.normalizer
    }

    fn next_block(&mut self, block: &mut [f32]) -> Result<ReadStatus> {
        let remaining = &self.samples[self.position..];
        if remaining.is_empty() {
            return Ok(ReadStatus::EndOfStream);
        }

        let n = block.len().min(remaining.len());
        for (out, &s) in block.iter_mut().zip(&remaining[..n]) {
            *out = self.normalizer.normalize(s);
        }
        self.position += n;
        Ok(ReadStatus::Samples(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_blocks_until_exhausted() {
        let mut source = MemorySource::new((0..10).map(|s| s * 100).collect(), 2, 8000);
        assert_eq!(source.spec().total_frames, 5);
        assert_eq!(source.normalizer().peak(), 900.0);

        let mut block = [0.0f32; 4];
        assert_eq!(source.next_block(&mut block).unwrap(), ReadStatus::Samples(4));
        assert_eq!(block[1], 100.0 / 900.0);
        assert_eq!(source.next_block(&mut block).unwrap(), ReadStatus::Samples(4));
        assert_eq!(source.next_block(&mut block).unwrap(), ReadStatus::Samples(2));
        assert_eq!(source.next_block(&mut block).unwrap(), ReadStatus::EndOfStream);
        assert_eq!(source.next_block(&mut block).unwrap(), ReadStatus::EndOfStream);
    }

    #[test]
    fn partial_trailing_frame_is_dropped() {
        let source = MemorySource::new(vec![1, 2, 3], 2, 8000);
        assert_eq!(source.spec().total_frames, 1);
    }
}
