//! Operator commands and the loop that applies them.
//!
//! Commands are whitespace-separated words, case-insensitive:
//!
//! | command              | effect                                  |
//! |----------------------|-----------------------------------------|
//! | `volume <0..1>`      | ramp the volume to a new target         |
//! | `bass <-1..1>`       | set a band gain (`mid`, `treble` alike) |
//! | `threshold <0..1>`   | compressor threshold                    |
//! | `ratio <>=1>`        | compressor ratio                        |
//! | `status`             | print the current settings              |
//! | `help`               | list commands                           |
//! | `quit`               | stop playback                           |

use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, warn};

use crate::error::CommandError;
use crate::params::{Band, ParamHandle};
use crate::playback::StopSignal;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub const HELP: &str = "\
commands:
  volume <0..1>       ramp volume to a new level
  bass <-1..1>        bass gain
  mid <-1..1>         mid gain
  treble <-1..1>      treble gain
  threshold <0..1>    compressor threshold
  ratio <1..>         compressor ratio
  status              show current settings
  help                show this list
  quit                stop playback";

/// A parsed operator command
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    Volume(f32),
    Gain(Band, f32),
    Threshold(f32),
    Ratio(f32),
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Err(CommandError::Unknown(String::new()));
        };

        let name = word.to_ascii_lowercase();
        let mut value = |field: &'static str| -> Result<f32, CommandError> {
            let raw = words.next().ok_or(CommandError::MissingValue(field))?;
            raw.parse::<f32>()
                .map_err(|_| CommandError::InvalidNumber(raw.to_string()))
        };

        let cmd = match name.as_str() {
            "volume" => Command::Volume(value("volume")?),
            "bass" => Command::Gain(Band::Bass, value("bass")?),
            "mid" => Command::Gain(Band::Mid, value("mid")?),
            "treble" => Command::Gain(Band::Treble, value("treble")?),
            "threshold" => Command::Threshold(value("threshold")?),
            "ratio" => Command::Ratio(value("ratio")?),
            "status" => Command::Status,
            "help" => Command::Help,
            "quit" => Command::Quit,
            _ => return Err(CommandError::Unknown(word.to_string())),
        };
        if let Some(extra) = words.next() {
            return Err(CommandError::UnexpectedArgument(extra.to_string()));
        }
        Ok(cmd)
    }
}

/// Whether the control loop should keep reading
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Reads operator commands and turns them into parameter updates.
///
/// Runs on the control thread, never blocks the playback path. Bad input is
/// reported and ignored.
pub struct ControlLoop {
    params: ParamHandle,
    stop: StopSignal,
}

impl ControlLoop {
    pub fn new(params: ParamHandle, stop: StopSignal) -> Self {
        Self { params, stop }
    }

    #[inline]
    pub fn params(&self) -> &ParamHandle {
        &self.params
    }

    /// Apply a command. Returns text to show the operator, if any.
    pub fn execute(&mut self, cmd: Command) -> Result<(Flow, Option<String>), CommandError> {
        match cmd {
            Command::Volume(v) => self.params.set_target_volume(v)?,
            Command::Gain(band, g) => self.params.set_band_gain(band, g)?,
            Command::Threshold(t) => self.params.set_threshold(t)?,
            Command::Ratio(r) => self.params.set_ratio(r)?,
            Command::Status => return Ok((Flow::Continue, Some(self.status()))),
            Command::Help => return Ok((Flow::Continue, Some(HELP.to_string()))),
            Command::Quit => {
                self.stop.request_stop();
                return Ok((Flow::Quit, None));
            }
        }
        debug!(?cmd, "parameter update queued");
        Ok((Flow::Continue, None))
    }

    /// Parse and apply one line of input. Blank lines are ignored.
    pub fn handle_line(&mut self, line: &str) -> Result<(Flow, Option<String>), CommandError> {
        if line.trim().is_empty() {
            return Ok((Flow::Continue, None));
        }
        let cmd = line.parse::<Command>()?;
        self.execute(cmd)
    }

    /// Current settings, with the volume the playback path is actually at.
    pub fn status(&self) -> String {
        let p = self.params.requested();
        let mut out = format!(
            "volume {:.2} (target {:.2})",
            self.params.current_volume(),
            p.volume
        );
        for band in Band::ALL {
            out.push_str(&format!(", {} {:+.2}", band.name(), p.gains.get(band)));
        }
        out.push_str(&format!(
            ", threshold {:.2}, ratio {:.1}",
            p.compression_threshold, p.compression_ratio
        ));
        out
    }

    /// Handle lines from `lines` until `quit`, a stop request from playback
    /// or the input closing. Responses and errors go to `out`.
    ///
    /// Input closing counts as `quit`.
    pub fn run<W: Write>(&mut self, lines: &Receiver<String>, out: &mut W) -> io::Result<()> {
        loop {
            if self.stop.is_stop_requested() {
                debug!("playback stopped, leaving control loop");
                return Ok(());
            }

            let line = match lines.recv_timeout(POLL_INTERVAL) {
                Ok(line) => line,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("input closed");
                    self.stop.request_stop();
                    return Ok(());
                }
            };

            match self.handle_line(&line) {
                Ok((Flow::Quit, _)) => return Ok(()),
                Ok((Flow::Continue, Some(text))) => writeln!(out, "{}", text)?,
                Ok((Flow::Continue, None)) => {}
                Err(e) => {
                    warn!(%e, input = %line.trim(), "command rejected");
                    writeln!(out, "{}", e)?;
                }
            }
            out.flush()?;
        }
    }
}

/// Lines of stdin, read on a background thread.
///
/// The channel disconnects when stdin closes or fails.
pub fn stdin_lines() -> Receiver<String> {
    let (sender, receiver) = crossbeam_channel::unbounded();
    let spawned = thread::Builder::new()
        .name("klangkette-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if sender.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        warn!(%e, "could not start stdin reader");
    }
    receiver
}
