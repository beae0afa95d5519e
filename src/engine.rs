//! Session lifecycle: one playback thread plus the control-side handles.

use std::thread::{self, JoinHandle};

use tracing::{error, info};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::nodes::sink::Sink;
use crate::nodes::source::{SampleSource, StreamSpec};
use crate::params::{self, ParamHandle};
use crate::playback::{PlaybackLoop, PlaybackReport, StopSignal};

/// Raises the stop flag when the playback thread exits, panics included.
struct StopOnExit(StopSignal);

impl Drop for StopOnExit {
    fn drop(&mut self) {
        self.0.request_stop();
    }
}

/// A running playback session.
///
/// Owns the playback thread. The control path keeps the [`ParamHandle`]
/// returned by [`Session::start`] and, optionally, a clone of the
/// [`StopSignal`]. Dropping a session stops playback and waits for it.
///
/// ```no_run
/// use klangkette::{EngineConfig, Session, RtrbSink, MemorySource};
///
/// let source = MemorySource::silence(1.0, 1, 44100);
/// let (sink, _consumer) = RtrbSink::with_capacity(1 << 16);
/// let (session, mut params) = Session::start(source, sink, &EngineConfig::default()).unwrap();
///
/// params.set_target_volume(0.5).unwrap();
/// let report = session.wait().unwrap();
/// ```
pub struct Session {
    spec: StreamSpec,
    stop: StopSignal,
    thread: Option<JoinHandle<Result<PlaybackReport>>>,
}

impl Session {
    /// Build the parameter store and the playback loop, then start playing.
    pub fn start<S: SampleSource, K: Sink>(
        source: S,
        sink: K,
        config: &EngineConfig,
    ) -> Result<(Self, ParamHandle)> {
        let (handle, store) = params::channel(
            config.initial,
            config.ramp_step,
            config.message_queue_size,
        );
        let playback = PlaybackLoop::new(source, sink, store, StopSignal::new(), config);
        let session = Self::spawn(playback)?;
        Ok((session, handle))
    }

    /// Run an already-built playback loop on its own thread.
    pub fn spawn<S: SampleSource, K: Sink>(mut playback: PlaybackLoop<S, K>) -> Result<Self> {
        let spec = *playback.spec();
        let stop = playback.stop_signal();
        let on_exit = StopOnExit(stop.clone());
        let thread = thread::Builder::new()
            .name("klangkette-playback".into())
            .spawn(move || {
                let _on_exit = on_exit;
                playback.run()
            })
            .map_err(|e| EngineError::PlaybackThread(e.to_string()))?;

        info!(
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            secs = spec.duration_secs(),
            "session started"
        );
        Ok(Self {
            spec,
            stop,
            thread: Some(thread),
        })
    }

    #[inline]
    pub fn spec(&self) -> &StreamSpec {
        &self.spec
    }

    /// A handle to the shared stop flag
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Ask playback to stop after the block in flight.
    pub fn stop(&self) {
        self.stop.request_stop();
    }

    /// True once the playback thread has exited
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Wait for playback to reach `Stopped` and return its report.
    pub fn wait(mut self) -> Result<PlaybackReport> {
        self.join()
    }

    fn join(&mut self) -> Result<PlaybackReport> {
        let thread = self
            .thread
            .take()
            .ok_or_else(|| EngineError::PlaybackThread("session already joined".into()))?;
        thread
            .join()
            .map_err(|_| EngineError::PlaybackThread("playback thread panicked".into()))?
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.stop.request_stop();
            if let Err(e) = self.join() {
                error!(%e, "playback ended with an error");
            }
        }
    }
}
