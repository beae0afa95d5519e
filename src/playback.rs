//! The real-time path: source → effects chain → sink, one block at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::chain::EffectsChain;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::node::{Effect, ProcessContext};
use crate::nodes::sink::Sink;
use crate::nodes::source::{Normalizer, ReadStatus, SampleSource, StreamSpec};
use crate::params::{ParamStore, Params};

/// Lifecycle of a [`PlaybackLoop`]. `Stopped` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Running,
    Stopped,
}

/// Why playback ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The source ran out of samples
    EndOfStream,
    /// A stop was requested between blocks
    StopRequested,
}

/// Summary of a finished playback run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackReport {
    pub blocks: u64,
    pub frames: u64,
    pub reason: StopReason,
}

/// Cooperative stop flag shared by the playback and control paths.
///
/// The playback path checks it between blocks and raises it itself when the
/// source is exhausted, so the control path can tell the session is over.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// What a block observer sees after each block is written
#[derive(Clone, Copy, Debug)]
pub struct BlockInfo {
    /// Zero-based block index
    pub index: u64,
    /// Samples in this block
    pub samples: usize,
    /// Parameter snapshot the block was processed with
    pub params: Params,
}

type BlockObserver = Box<dyn FnMut(&BlockInfo) + Send>;

/// Pulls blocks from a source, runs them through the effects chain and
/// writes them to a sink until the stream ends or a stop is requested.
///
/// Each iteration reads one block, applies pending parameter updates and one
/// volume ramp step, processes, de-normalizes and writes. The source and
/// sink are released when the loop enters [`PlaybackState::Stopped`].
pub struct PlaybackLoop<S: SampleSource, K: Sink> {
    spec: StreamSpec,
    ctx: ProcessContext,
    state: PlaybackState,
    source: Option<S>,
    sink: Option<K>,
    normalizer: Normalizer,
    chain: EffectsChain,
    params: ParamStore,
    stop: StopSignal,
    block: Vec<f32>,
    output: Vec<i16>,
    blocks: u64,
    frames: u64,
    observer: Option<BlockObserver>,
}

impl<S: SampleSource, K: Sink> PlaybackLoop<S, K> {
    pub fn new(source: S, sink: K, params: ParamStore, stop: StopSignal, config: &EngineConfig) -> Self {
        let spec = source.spec();
        let ctx = ProcessContext::new(spec.sample_rate, spec.channels as usize, config.block_size);

        Self {
            spec,
            normalizer: source.normalizer(),
            chain: EffectsChain::new(&ctx, config),
            block: vec![0.0; ctx.block_size],
            output: Vec::with_capacity(ctx.block_size),
            ctx,
            state: PlaybackState::Idle,
            source: Some(source),
            sink: Some(sink),
            params,
            stop,
            blocks: 0,
            frames: 0,
            observer: None,
        }
    }

    /// Call `observer` after every written block (metering, diagnostics).
    pub fn with_block_observer(mut self, observer: impl FnMut(&BlockInfo) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    #[inline]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Layout of the stream being played
    #[inline]
    pub fn spec(&self) -> &StreamSpec {
        &self.spec
    }

    /// The stop flag this loop checks between blocks
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    #[inline]
    pub fn context(&self) -> &ProcessContext {
        &self.ctx
    }

    /// Blocks written so far
    #[inline]
    pub fn blocks_processed(&self) -> u64 {
        self.blocks
    }

    /// True once the source and sink have been let go
    pub fn is_released(&self) -> bool {
        self.source.is_none() && self.sink.is_none()
    }

    /// Run until end of stream or a stop request.
    ///
    /// Errors from the source or sink are fatal: the loop stops, releases
    /// both ends and returns the error. The stop flag is raised on every
    /// exit, so the control path learns the session is over.
    pub fn run(&mut self) -> Result<PlaybackReport> {
        if self.state != PlaybackState::Idle {
            return Err(EngineError::PlaybackThread(format!(
                "playback loop already {:?}",
                self.state
            )));
        }

        self.state = PlaybackState::Running;
        info!(
            sample_rate = self.ctx.sample_rate,
            channels = self.ctx.channels,
            block_size = self.ctx.block_size,
            peak = self.normalizer.peak(),
            "playback started"
        );

        let streamed = self.stream();
        let released = self.release();
        let reason = streamed?;
        released?;

        let report = PlaybackReport {
            blocks: self.blocks,
            frames: self.frames,
            reason,
        };
        info!(blocks = report.blocks, frames = report.frames, reason = ?report.reason, "playback stopped");
        Ok(report)
    }

    fn stream(&mut self) -> Result<StopReason> {
        let (Some(source), Some(sink)) = (self.source.as_mut(), self.sink.as_mut()) else {
            return Err(EngineError::PlaybackThread("source or sink already released".into()));
        };
        let normalizer = self.normalizer;

        loop {
            if self.stop.is_stop_requested() {
                debug!(blocks = self.blocks, "stop requested");
                return Ok(StopReason::StopRequested);
            }

            let n = match source.next_block(&mut self.block)? {
                ReadStatus::Samples(n) => n,
                ReadStatus::EndOfStream => {
                    self.stop.request_stop();
                    return Ok(StopReason::EndOfStream);
                }
            };

            let params = self.params.next_snapshot();
            let block = &mut self.block[..n];
            self.chain.process(&self.ctx, &params, block);

            self.output.clear();
            self.output
                .extend(block.iter().map(|&s| normalizer.denormalize(s)));
            sink.write(&self.output)?;

            trace!(index = self.blocks, samples = n, volume = params.volume, "block written");
            if let Some(observer) = self.observer.as_mut() {
                observer(&BlockInfo {
                    index: self.blocks,
                    samples: n,
                    params,
                });
            }
            self.blocks += 1;
            self.frames += (n / self.ctx.channels) as u64;
        }
    }

    /// Enter `Stopped`: raise the stop flag, drop the source, close the sink.
    fn release(&mut self) -> Result<()> {
        self.state = PlaybackState::Stopped;
        self.stop.request_stop();
        self.source.take();
        match self.sink.take() {
            Some(mut sink) => sink.close(),
            None => Ok(()),
        }
    }
}
