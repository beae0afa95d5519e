//! WAV file source

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader};
use tracing::{debug, warn};

use crate::error::{EngineError, Result};

use super::{Normalizer, ReadStatus, SampleSource, StreamSpec};

/// Streams 16-bit integer PCM from a WAV file.
///
/// Opening the file scans every sample for the global peak and then rewinds
/// to the first frame. That is the only rewind; reads after it are
/// sequential.
pub struct WavSource {
    reader: WavReader<BufReader<File>>,
    path: PathBuf,
    spec: StreamSpec,
    normalizer: Normalizer,
    samples_read: u64,
}

impl WavSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let unavailable = |err: &dyn std::fmt::Display| {
            EngineError::SourceUnavailable(format!("{}: {}", path.display(), err))
        };

        let mut reader = WavReader::open(&path).map_err(|e| match e {
            hound::Error::Unsupported => {
                EngineError::UnsupportedFormat(format!("{}: unsupported WAV encoding", path.display()))
            }
            other => unavailable(&other),
        })?;

        let wav = reader.spec();
        if wav.sample_format != SampleFormat::Int || wav.bits_per_sample != 16 {
            return Err(EngineError::UnsupportedFormat(format!(
                "{}: {}-bit {:?}, expected 16-bit integer PCM",
                path.display(),
                wav.bits_per_sample,
                wav.sample_format
            )));
        }

        // peak pre-pass over the whole file
        let mut peak = 0u32;
        for sample in reader.samples::<i16>() {
            let sample = sample.map_err(|e| unavailable(&e))?;
            peak = peak.max(sample.unsigned_abs() as u32);
        }
        reader.seek(0).map_err(|e| unavailable(&e))?;

        let spec = StreamSpec {
            sample_rate: wav.sample_rate,
            channels: wav.channels,
            total_frames: reader.duration() as u64,
        };
        debug!(
            path = %path.display(),
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            frames = spec.total_frames,
            peak,
            "opened wav source"
        );

        Ok(Self {
            reader,
            path,
            spec,
            normalizer: Normalizer::from_peak(peak),
            samples_read: 0,
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames handed out so far
    #[inline]
    pub fn frames_read(&self) -> u64 {
        self.samples_read / self.spec.channels.max(1) as u64
    }
}

impl SampleSource for WavSource {
    fn spec(&self) -> StreamSpec {
        self.spec
    }

    fn normalizer(&self) -> Normalizer {
        self.normalizer
    }

    fn next_block(&mut self, block: &mut [f32]) -> Result<ReadStatus> {
        let mut n = 0;
        for (out, sample) in block.iter_mut().zip(self.reader.samples::<i16>()) {
            *out = self.normalizer.normalize(sample?);
            n += 1;
        }

        let channels = self.spec.channels.max(1) as usize;
        let partial = n % channels;
        if partial != 0 {
            warn!(samples = partial, "dropping truncated trailing frame");
            n -= partial;
        }

        self.samples_read += n as u64;
        if n == 0 {
            Ok(ReadStatus::EndOfStream)
        } else {
            Ok(ReadStatus::Samples(n))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, samples: &[i16], channels: u16, bits: u16) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 22050,
            bits_per_sample: bits,
            sample_format: SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            if bits == 16 {
                writer.write_sample(s).unwrap();
            } else {
                writer.write_sample(s as i32).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn opens_scans_peak_and_rewinds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ramp.wav");
        let samples: Vec<i16> = (0..1000).map(|i| (i - 500) * 20).collect();
        write_wav(&path, &samples, 2, 16);

        let mut source = WavSource::open(&path).unwrap();
        assert_eq!(source.spec().channels, 2);
        assert_eq!(source.spec().sample_rate, 22050);
        assert_eq!(source.spec().total_frames, 500);
        assert_eq!(source.normalizer().peak(), 10000.0);

        // first block starts at the first sample, not after the pre-pass
        let mut block = vec![0.0f32; 600];
        assert_eq!(source.next_block(&mut block).unwrap(), ReadStatus::Samples(600));
        assert_eq!(block[0], -1.0);
        assert_eq!(source.next_block(&mut block).unwrap(), ReadStatus::Samples(400));
        assert_eq!(source.next_block(&mut block).unwrap(), ReadStatus::EndOfStream);
        assert_eq!(source.frames_read(), 500);
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = WavSource::open(dir.path().join("nope.wav")).err().unwrap();
        assert!(matches!(err, EngineError::SourceUnavailable(_)));
    }

    #[test]
    fn non_16_bit_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.wav");
        write_wav(&path, &[1, 2, 3, 4], 1, 24);
        let err = WavSource::open(&path).err().unwrap();
        assert!(matches!(err, EngineError::UnsupportedFormat(_)));
    }
}
