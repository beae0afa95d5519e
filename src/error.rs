//! Error types for the engine and the control path.

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Fatal engine errors.
///
/// Any of these ends the session. End of stream is not an error and never
/// shows up here.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Backing store could not be opened or read
    #[error("Sample source unavailable: {0}")]
    SourceUnavailable(String),

    /// Backing store holds something other than 16-bit integer PCM
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Output device could not be opened
    #[error("Sink unavailable: {0}")]
    SinkUnavailable(String),

    /// A write to an open sink failed
    #[error("Sink write failed: {0}")]
    SinkWrite(String),

    /// The playback thread could not be spawned or panicked
    #[error("Playback thread error: {0}")]
    PlaybackThread(String),
}

impl From<hound::Error> for EngineError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::Unsupported => {
                EngineError::UnsupportedFormat("unsupported WAV encoding".into())
            }
            other => EngineError::SourceUnavailable(other.to_string()),
        }
    }
}

#[cfg(feature = "cpal_sink")]
impl From<cpal::BuildStreamError> for EngineError {
    fn from(err: cpal::BuildStreamError) -> Self {
        EngineError::SinkUnavailable(err.to_string())
    }
}

#[cfg(feature = "cpal_sink")]
impl From<cpal::PlayStreamError> for EngineError {
    fn from(err: cpal::PlayStreamError) -> Self {
        EngineError::SinkUnavailable(err.to_string())
    }
}

#[cfg(feature = "cpal_sink")]
impl From<cpal::DefaultStreamConfigError> for EngineError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        EngineError::SinkUnavailable(err.to_string())
    }
}

/// Recoverable errors raised while handling an operator command.
///
/// These are reported and the control loop keeps going; nothing is mutated.
#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Unknown command: '{0}' (try 'help')")]
    Unknown(String),

    #[error("Missing value for '{0}'")]
    MissingValue(&'static str),

    #[error("Not a number: '{0}'")]
    InvalidNumber(String),

    /// Words left over after a complete command
    #[error("Unexpected argument: '{0}'")]
    UnexpectedArgument(String),

    /// Value parsed but falls outside the parameter's range
    #[error("Invalid value {value} for {name}: expected {range}")]
    InvalidParameterValue {
        name: &'static str,
        value: f32,
        range: &'static str,
    },

    /// Parameter queue is full; the update was dropped
    #[error("Parameter queue full, try again")]
    QueueFull,
}
