//! CPAL audio output sink

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, sleep, JoinHandle};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample};
use crossbeam_channel::{bounded, Sender};
use rtrb::{Consumer, Producer, RingBuffer};
use tracing::{debug, error, warn};

use crate::config::SinkConfig;
use crate::error::{EngineError, Result};

use super::Sink;

/// Counters shared with the device callback
#[derive(Clone, Default)]
struct StreamStatus {
    /// Tracks how many samples CPAL has consumed
    samples_consumed: Arc<AtomicUsize>,
    /// Tracks underrun state for diagnostics
    had_underrun: Arc<AtomicBool>,
    /// Set by the stream's error callback; fails the next write
    failed: Arc<AtomicBool>,
}

/// A sink that outputs audio to a CPAL device
///
/// The CPAL stream runs on its own thread; writes feed samples into a ring
/// buffer that the stream's callback consumes. A full ring buffer blocks
/// the writer, so playback is paced by the device.
pub struct CpalSink {
    buffer: Producer<i16>,
    capacity: usize,
    sample_rate: u32,
    channels: usize,
    status: StreamStatus,
    shutdown: Option<Sender<()>>,
    stream_thread: Option<JoinHandle<()>>,
}

impl CpalSink {
    /// Open an output stream on `device` in the device's native sample
    /// format, configured from `config`.
    pub fn open(device: &cpal::Device, format: SampleFormat, config: &SinkConfig) -> Result<Self> {
        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: match config.buffer_frames {
                Some(frames) => cpal::BufferSize::Fixed(frames),
                None => cpal::BufferSize::Default,
            },
        };
        let channels = config.channels.max(1) as usize;

        // Ring buffer sized for ~100ms of audio to handle scheduling jitter
        let buffer_samples = ((config.sample_rate as f32 * 0.1) as usize) * channels;
        let capacity = buffer_samples.next_power_of_two().max(8192);
        let (producer, consumer) = RingBuffer::<i16>::new(capacity);

        let status = StreamStatus::default();
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let device = device.clone();
        let thread_status = status.clone();
        let stream_thread = thread::Builder::new()
            .name("klangkette-output".into())
            .spawn(move || {
                let started = build_stream(&device, format, &stream_config, consumer, thread_status)
                    .map_err(EngineError::from)
                    .and_then(|stream| match stream.play() {
                        Ok(()) => Ok(stream),
                        Err(e) => Err(EngineError::from(e)),
                    });
                let stream = match started {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                // Keep the stream alive until close() or drop
                let _ = shutdown_rx.recv();
                drop(stream);
            })
            .map_err(|e| EngineError::SinkUnavailable(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = stream_thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = stream_thread.join();
                return Err(EngineError::SinkUnavailable("output thread exited".into()));
            }
        }

        debug!(
            sample_rate = config.sample_rate,
            channels,
            ?format,
            capacity,
            "output stream started"
        );

        Ok(Self {
            buffer: producer,
            capacity,
            sample_rate: config.sample_rate,
            channels,
            status,
            shutdown: Some(shutdown_tx),
            stream_thread: Some(stream_thread),
        })
    }

    /// Returns how many samples have been played
    #[inline]
    pub fn samples_consumed(&self) -> usize {
        self.status.samples_consumed.load(Ordering::Relaxed)
    }

    /// Check and clear the underrun flag
    pub fn check_underrun(&self) -> bool {
        self.status.had_underrun.swap(false, Ordering::Relaxed)
    }

    fn check_stream(&self) -> Result<()> {
        if self.status.failed.load(Ordering::Relaxed) || self.buffer.is_abandoned() {
            return Err(EngineError::SinkWrite("output stream failed".into()));
        }
        Ok(())
    }

    /// Wait for queued samples to play out, bounded by the buffer's duration.
    fn drain(&self) {
        let samples_per_sec = self.sample_rate.max(1) as f64 * self.channels as f64;
        let buffered = Duration::from_secs_f64(self.capacity as f64 / samples_per_sec);
        let deadline = Instant::now() + buffered + Duration::from_millis(250);

        while self.buffer.slots() < self.capacity {
            if Instant::now() >= deadline || self.check_stream().is_err() {
                warn!(
                    pending = self.capacity - self.buffer.slots(),
                    "output did not drain before close"
                );
                return;
            }
            sleep(Duration::from_millis(1));
        }
    }

    fn shutdown(&mut self) {
        // dropping the sender wakes the stream thread
        self.shutdown.take();
        if let Some(thread) = self.stream_thread.take() {
            if thread.join().is_err() {
                error!("output stream thread panicked");
            }
        }
    }
}

impl Sink for CpalSink {
    fn write(&mut self, samples: &[i16]) -> Result<()> {
        let mut remaining = samples;
        while !remaining.is_empty() {
            self.check_stream()?;

            let slots = self.buffer.slots();
            if slots == 0 {
                sleep(Duration::from_micros(500));
                continue;
            }

            let n = slots.min(remaining.len());
            for &s in &remaining[..n] {
                // room checked above
                let _ = self.buffer.push(s);
            }
            remaining = &remaining[n..];
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.stream_thread.is_some() {
            self.drain();
            self.shutdown();
            if self.check_underrun() {
                warn!("output ran dry during playback");
            }
            debug!(samples_played = self.samples_consumed(), "output stream closed");
        }
        Ok(())
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn build_stream(
    device: &cpal::Device,
    sample_format: SampleFormat,
    stream_config: &cpal::StreamConfig,
    consumer: Consumer<i16>,
    status: StreamStatus,
) -> std::result::Result<cpal::Stream, cpal::BuildStreamError> {
    match sample_format {
        SampleFormat::F32 => build_typed::<f32>(device, stream_config, consumer, status),
        SampleFormat::I16 => build_typed::<i16>(device, stream_config, consumer, status),
        SampleFormat::U16 => build_typed::<u16>(device, stream_config, consumer, status),
        SampleFormat::I32 => build_typed::<i32>(device, stream_config, consumer, status),
        SampleFormat::F64 => build_typed::<f64>(device, stream_config, consumer, status),
        _ => Err(cpal::BuildStreamError::StreamConfigNotSupported),
    }
}

fn build_typed<T>(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    mut consumer: Consumer<i16>,
    status: StreamStatus,
) -> std::result::Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<i16>,
{
    let StreamStatus {
        samples_consumed,
        had_underrun,
        failed,
    } = status;

    device.build_output_stream(
        stream_config,
        move |data: &mut [T], _| {
            let mut underrun = false;
            for sample in data.iter_mut() {
                *sample = match consumer.pop() {
                    Ok(s) => cpal::Sample::from_sample(s),
                    Err(_) => {
                        underrun = true;
                        T::EQUILIBRIUM
                    }
                };
            }
            if underrun {
                had_underrun.store(true, Ordering::Relaxed);
            }
            samples_consumed.fetch_add(data.len(), Ordering::Relaxed);
        },
        move |err| {
            error!(%err, "output stream error");
            failed.store(true, Ordering::Relaxed);
        },
        None,
    )
}
