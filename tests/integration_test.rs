use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use klangkette::params;
use klangkette::{
    BandGains, CommandError, ControlLoop, EngineConfig, MemorySource, ParamHandle, Params,
    PlaybackLoop, PlaybackState, RtrbSink, SampleSource, Session, StopReason, StopSignal,
    WavSource,
};
use rtrb::Consumer;

fn drain(consumer: &mut Consumer<i16>) -> Vec<i16> {
    std::iter::from_fn(|| consumer.pop().ok()).collect()
}

fn write_wav(path: &std::path::Path, samples: &[i16], channels: u16, sample_rate: u32) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
/// One second of 44.1 kHz mono silence plays to the end and stops cleanly
fn silence_plays_to_end_of_stream() {
    let config = EngineConfig::default();
    let (_handle, store) = params::channel(config.initial, config.ramp_step, 16);
    let (sink, mut consumer) = RtrbSink::with_capacity(1 << 16);
    let source = MemorySource::silence(1.0, 1, 44100);

    let mut playback = PlaybackLoop::new(source, sink, store, StopSignal::new(), &config);
    let report = playback.run().unwrap();

    assert_eq!(report.reason, StopReason::EndOfStream);
    assert_eq!(report.frames, 44100);
    assert_eq!(playback.state(), PlaybackState::Stopped);
    assert!(playback.is_released());

    let out = drain(&mut consumer);
    assert_eq!(out.len(), 44100);
    assert!(out.iter().all(|&s| s == 0));
}

#[test]
fn session_runs_on_its_own_thread() {
    let source = MemorySource::silence(1.0, 2, 44100);
    let (sink, mut consumer) = RtrbSink::with_capacity(1 << 18);
    let (session, handle) = Session::start(source, sink, &EngineConfig::default()).unwrap();

    let report = session.wait().unwrap();
    assert_eq!(report.reason, StopReason::EndOfStream);
    assert_eq!(report.frames, 44100);
    assert_eq!(drain(&mut consumer).len(), 88200);
    // the published volume is still readable after the session ends
    assert_eq!(handle.current_volume(), 1.0);
}

#[test]
fn quit_stops_a_long_session() {
    // ten minutes; a slow consumer keeps playback from racing ahead
    let source = MemorySource::silence(600.0, 1, 44100);
    let (sink, mut consumer) = RtrbSink::with_capacity(8192);
    let config = EngineConfig::default().with_block_size(1024);
    let (session, handle) = Session::start(source, sink, &config).unwrap();

    let reader = thread::spawn(move || {
        let mut total = 0;
        while !consumer.is_abandoned() {
            total += drain(&mut consumer).len();
            thread::sleep(Duration::from_millis(1));
        }
        total + drain(&mut consumer).len()
    });

    let mut control = ControlLoop::new(handle, session.stop_signal());
    let (tx, rx) = crossbeam_channel::unbounded();
    tx.send("volume 0.5".to_string()).unwrap();
    tx.send("quit".to_string()).unwrap();
    control.run(&rx, &mut std::io::sink()).unwrap();

    let report = session.wait().unwrap();
    assert_eq!(report.reason, StopReason::StopRequested);
    assert!(report.frames < 600 * 44100);

    let written = reader.join().unwrap();
    assert_eq!(written as u64, report.frames);
}

#[test]
fn control_loop_leaves_when_playback_ends() {
    let source = MemorySource::silence(0.1, 1, 44100);
    let (sink, _consumer) = RtrbSink::with_capacity(1 << 14);
    let (session, handle) = Session::start(source, sink, &EngineConfig::default()).unwrap();

    let mut control = ControlLoop::new(handle, session.stop_signal());
    // nothing is ever sent, the input stays open
    let (_tx, rx) = crossbeam_channel::unbounded::<String>();
    control.run(&rx, &mut std::io::sink()).unwrap();

    assert_eq!(session.wait().unwrap().reason, StopReason::EndOfStream);
}

#[test]
/// A fatal sink error ends the control loop without operator input
fn sink_failure_ends_the_control_loop() {
    let source = MemorySource::silence(10.0, 1, 44100);
    let (sink, consumer) = RtrbSink::with_capacity(1024);
    drop(consumer);
    let (session, handle) = Session::start(source, sink, &EngineConfig::default()).unwrap();

    let mut control = ControlLoop::new(handle, session.stop_signal());
    let (_tx, rx) = crossbeam_channel::unbounded::<String>();
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    let control_thread = thread::spawn(move || {
        let result = control.run(&rx, &mut std::io::sink());
        let _ = done_tx.send(());
        result
    });

    assert!(
        done_rx.recv_timeout(Duration::from_secs(5)).is_ok(),
        "control loop still waiting for input"
    );
    control_thread.join().unwrap().unwrap();
    assert!(matches!(
        session.wait(),
        Err(klangkette::EngineError::SinkWrite(_))
    ));
}

#[test]
/// A 1 kHz tone read from disk comes back at nearly its original level
fn wav_file_through_neutral_chain() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    let input: Vec<i16> = (0..44100)
        .map(|i| {
            let t = i as f64 / 44100.0;
            ((2.0 * std::f64::consts::PI * 1000.0 * t).sin() * 10000.0) as i16
        })
        .collect();
    write_wav(&path, &input, 1, 44100);

    let source = WavSource::open(&path).unwrap();
    assert_eq!(source.spec().total_frames, 44100);

    let config = EngineConfig::default().with_initial(Params {
        compression_threshold: 1.0,
        ..Params::default()
    });
    let (sink, mut consumer) = RtrbSink::with_capacity(1 << 16);
    let (session, _handle) = Session::start(source, sink, &config).unwrap();
    session.wait().unwrap();

    let out = drain(&mut consumer);
    assert_eq!(out.len(), input.len());
    let peak_in = input[22050..].iter().map(|s| s.unsigned_abs()).max().unwrap() as f32;
    let peak_out = out[22050..].iter().map(|s| s.unsigned_abs()).max().unwrap() as f32;
    let ratio = peak_out / peak_in;
    assert!((0.9..=1.01).contains(&ratio), "ratio = {}", ratio);
}

#[test]
fn missing_file_is_source_unavailable() {
    let err = WavSource::open("/definitely/not/here.wav").err().unwrap();
    assert!(matches!(err, klangkette::EngineError::SourceUnavailable(_)));
}

fn send_retrying(handle: &mut ParamHandle, gains: BandGains, stop: &StopSignal) -> bool {
    loop {
        match handle.set_band_gains(gains) {
            Ok(()) => return true,
            Err(CommandError::QueueFull) if !stop.is_stop_requested() => thread::yield_now(),
            Err(_) => return false,
        }
    }
}

#[test]
/// Every block sees all three band gains from the same update
fn concurrent_updates_are_never_torn() {
    let config = EngineConfig::default().with_block_size(64);
    let (mut handle, store) = params::channel(config.initial, config.ramp_step, 4);
    let stop = StopSignal::new();
    let source = MemorySource::silence(10.0, 1, 44100);
    let (sink, mut consumer) = RtrbSink::with_capacity(4096);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let observed = seen.clone();
    let playback = PlaybackLoop::new(source, sink, store, stop.clone(), &config)
        .with_block_observer(move |info| {
            if let Ok(mut seen) = observed.lock() {
                seen.push(info.params.gains);
            }
        });
    let session = Session::spawn(playback).unwrap();

    let reader = thread::spawn(move || {
        while !consumer.is_abandoned() {
            drain(&mut consumer);
            thread::yield_now();
        }
    });

    let mut sent = HashSet::new();
    sent.insert(0u32);
    for i in 1..=2000u32 {
        let value = (i % 200) as f32 / 100.0 - 1.0;
        if !send_retrying(&mut handle, BandGains::uniform(value), &stop) {
            break;
        }
        sent.insert(value.to_bits());
    }
    session.stop();
    session.wait().unwrap();
    reader.join().unwrap();

    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    for gains in seen.iter() {
        assert_eq!(gains.bass, gains.mid);
        assert_eq!(gains.mid, gains.treble);
        assert!(sent.contains(&gains.bass.to_bits()), "never sent {}", gains.bass);
    }
}
