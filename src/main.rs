//! Klangkette player
//!
//! Plays a 16-bit WAV file through the effects chain and reads commands
//! from stdin while it plays. Type `help` for the list.

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, Level};

use klangkette::{
    stdin_lines, ControlLoop, CpalDevice, EngineConfig, ParamMessage, Params, SampleSource,
    Session, SinkConfig, StopReason, WavSource, HELP,
};

/// Streaming audio effects chain with live control
#[derive(Parser)]
#[command(name = "klangkette", version)]
#[command(about = "Play a WAV file through volume, 3-band EQ and a compressor")]
struct Args {
    /// 16-bit PCM WAV file to play (asked for if omitted)
    path: Option<PathBuf>,

    /// Samples read per block
    #[arg(long, default_value_t = EngineConfig::DEFAULT_BLOCK_SIZE)]
    block_size: usize,

    /// Device buffer size in frames (0 = device default)
    #[arg(long, default_value_t = EngineConfig::DEFAULT_SINK_BUFFER_FRAMES)]
    buffer_frames: u32,

    /// Volume change per block while ramping
    #[arg(long, default_value_t = EngineConfig::DEFAULT_RAMP_STEP)]
    ramp_step: f32,

    /// Initial compressor threshold
    #[arg(long)]
    threshold: Option<f32>,

    /// Initial compressor ratio
    #[arg(long)]
    ratio: Option<f32>,

    /// Output device name (default device if omitted)
    #[arg(long)]
    device: Option<String>,

    /// List available audio output devices and exit
    #[arg(long)]
    list_devices: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Args {
    fn log_level(&self) -> Level {
        match (self.quiet, self.verbose) {
            (true, _) => Level::ERROR,
            (false, 0) => Level::INFO,
            (false, 1) => Level::DEBUG,
            (false, _) => Level::TRACE,
        }
    }

    fn engine_config(&self) -> Result<EngineConfig, Box<dyn Error>> {
        let defaults = Params::default();
        let initial = Params {
            compression_threshold: self.threshold.unwrap_or(defaults.compression_threshold),
            compression_ratio: self.ratio.unwrap_or(defaults.compression_ratio),
            ..defaults
        };
        ParamMessage::SetThreshold(initial.compression_threshold).validate()?;
        ParamMessage::SetRatio(initial.compression_ratio).validate()?;
        if !(self.ramp_step.is_finite() && self.ramp_step > 0.0) {
            return Err(format!("ramp step must be positive, got {}", self.ramp_step).into());
        }

        let buffer_frames = (self.buffer_frames > 0).then_some(self.buffer_frames);
        Ok(EngineConfig::default()
            .with_block_size(self.block_size)
            .with_sink_buffer_frames(buffer_frames)
            .with_ramp_step(self.ramp_step)
            .with_initial(initial))
    }
}

fn prompt_path() -> io::Result<PathBuf> {
    print!("WAV file to play: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(PathBuf::from(line.trim()))
}

fn list_devices() {
    let default = CpalDevice::default_output().map(|d| d.name().to_string());
    let devices = CpalDevice::list_outputs();
    if devices.is_empty() {
        println!("No output devices found");
    }
    for device in devices {
        let marker = if Some(device.name()) == default.as_deref() { "*" } else { " " };
        println!(
            "{} {} ({} Hz, {} ch)",
            marker,
            device.name(),
            device.sample_rate(),
            device.channels()
        );
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .with_writer(io::stderr)
        .init();

    if args.list_devices {
        list_devices();
        return Ok(());
    }

    let config = args.engine_config()?;
    let path = match &args.path {
        Some(path) => path.clone(),
        None => prompt_path()?,
    };

    let source = WavSource::open(&path)?;
    let spec = source.spec();
    info!(
        path = %path.display(),
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        secs = spec.duration_secs(),
        "opened source"
    );

    let device = match &args.device {
        Some(name) => CpalDevice::by_name(name)
            .ok_or_else(|| format!("no output device named '{}'", name))?,
        None => CpalDevice::default_output().ok_or("no default output device")?,
    };
    let sink = device.open_sink(&SinkConfig::for_stream(&spec, config.sink_buffer_frames))?;
    info!(device = device.name(), "opened output");

    let (session, params) = Session::start(source, sink, &config)?;
    let mut control = ControlLoop::new(params, session.stop_signal());

    println!("{}", HELP);
    let lines = stdin_lines();
    control.run(&lines, &mut io::stdout())?;

    let report = session.wait()?;
    let how = match report.reason {
        StopReason::EndOfStream => "finished",
        StopReason::StopRequested => "stopped",
    };
    println!(
        "{} after {:.1} s ({} blocks)",
        how,
        report.frames as f64 / spec.sample_rate as f64,
        report.blocks
    );
    Ok(())
}
