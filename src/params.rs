//! Parameter store shared between the control path and the playback path.
//!
//! The control path never touches the values the playback path reads.
//! Updates travel as [`ParamMessage`]s through a lock-free SPSC ring buffer
//! and are applied by the playback thread between blocks, so every block is
//! processed against one consistent [`Params`] snapshot.
//!
//! ```
//! use klangkette::params::{self, Band, Params};
//!
//! let (mut handle, mut store) = params::channel(Params::default(), 0.01, 64);
//! handle.set_band_gain(Band::Bass, 0.5).unwrap();
//!
//! // playback side, once per block
//! let snapshot = store.next_snapshot();
//! assert_eq!(snapshot.gains.bass, 0.5);
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};
use tracing::trace;

use crate::error::CommandError;

/// Equalizer bands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Band {
    Bass,
    Mid,
    Treble,
}

impl Band {
    pub const ALL: [Band; 3] = [Band::Bass, Band::Mid, Band::Treble];

    pub fn name(&self) -> &'static str {
        match self {
            Band::Bass => "bass",
            Band::Mid => "mid",
            Band::Treble => "treble",
        }
    }
}

/// Per-band gain offsets, applied as `(1 + gain)`
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandGains {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
}

impl BandGains {
    /// Same gain on every band
    pub fn uniform(gain: f32) -> Self {
        Self {
            bass: gain,
            mid: gain,
            treble: gain,
        }
    }

    #[inline]
    pub fn get(&self, band: Band) -> f32 {
        match band {
            Band::Bass => self.bass,
            Band::Mid => self.mid,
            Band::Treble => self.treble,
        }
    }

    #[inline]
    pub fn set(&mut self, band: Band, gain: f32) {
        match band {
            Band::Bass => self.bass = gain,
            Band::Mid => self.mid = gain,
            Band::Treble => self.treble = gain,
        }
    }
}

/// One consistent set of effect parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Params {
    /// Output volume (0.0 - 1.0)
    pub volume: f32,
    /// Equalizer band gains (-1.0 - 1.0 each)
    pub gains: BandGains,
    /// Peak level above which a block is compressed (0.0, 1.0]
    pub compression_threshold: f32,
    /// Gain reduction ratio (>= 1.0)
    pub compression_ratio: f32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            volume: 1.0,
            gains: BandGains::default(),
            compression_threshold: 0.5,
            compression_ratio: 4.0,
        }
    }
}

/// A requested parameter change.
///
/// Multi-field updates are a single message so the playback path applies
/// them together.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamMessage {
    /// Ramp volume toward this target, one step per block
    SetTargetVolume(f32),
    /// Jump to this volume immediately (cancels any ramp)
    SetVolume(f32),
    /// Set one band's gain immediately
    SetBandGain(Band, f32),
    /// Set all band gains at once
    SetBandGains(BandGains),
    SetThreshold(f32),
    SetRatio(f32),
}

fn check(
    name: &'static str,
    value: f32,
    range: &'static str,
    ok: impl Fn(f32) -> bool,
) -> Result<(), CommandError> {
    if value.is_finite() && ok(value) {
        Ok(())
    } else {
        Err(CommandError::InvalidParameterValue { name, value, range })
    }
}

impl ParamMessage {
    /// Reject values outside each parameter's range.
    pub fn validate(&self) -> Result<(), CommandError> {
        let volume = |v: f32| (0.0..=1.0).contains(&v);
        let gain = |g: f32| (-1.0..=1.0).contains(&g);
        match *self {
            ParamMessage::SetTargetVolume(v) | ParamMessage::SetVolume(v) => {
                check("volume", v, "0.0 - 1.0", volume)
            }
            ParamMessage::SetBandGain(band, g) => check(band.name(), g, "-1.0 - 1.0", gain),
            ParamMessage::SetBandGains(gains) => Band::ALL
                .iter()
                .try_for_each(|&band| check(band.name(), gains.get(band), "-1.0 - 1.0", gain)),
            ParamMessage::SetThreshold(t) => check("threshold", t, "0.0 < t <= 1.0", |t| {
                t > 0.0 && t <= 1.0
            }),
            ParamMessage::SetRatio(r) => check("ratio", r, ">= 1.0", |r| r >= 1.0),
        }
    }

    fn apply(&self, params: &mut Params) {
        match *self {
            // the ramp owns volume movement; see `ParamStore::apply`
            ParamMessage::SetTargetVolume(_) => {}
            ParamMessage::SetVolume(v) => params.volume = v,
            ParamMessage::SetBandGain(band, g) => params.gains.set(band, g),
            ParamMessage::SetBandGains(gains) => params.gains = gains,
            ParamMessage::SetThreshold(t) => params.compression_threshold = t,
            ParamMessage::SetRatio(r) => params.compression_ratio = r,
        }
    }
}

/// Moves volume toward a target by a fixed step per tick.
///
/// Never overshoots: the final step lands exactly on the target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumeRamp {
    target: f32,
    step: f32,
}

impl VolumeRamp {
    /// Absorbs float drift accumulated over many steps
    const TOLERANCE: f32 = 1e-6;

    /// A step of 0 makes every change immediate. Negative steps count by
    /// magnitude; NaN or infinite steps are treated as 0.
    pub fn new(target: f32, step: f32) -> Self {
        Self {
            target: target.clamp(0.0, 1.0),
            step: Self::sanitize_step(step),
        }
    }

    /// Step magnitude, with non-finite steps mapped to 0
    pub fn sanitize_step(step: f32) -> f32 {
        if step.is_finite() {
            step.abs()
        } else {
            0.0
        }
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target.clamp(0.0, 1.0);
    }

    /// Returns the volume one tick after `current`.
    pub fn advance(&self, current: f32) -> f32 {
        let delta = self.target - current;
        let next = if self.step == 0.0 || delta.abs() <= self.step + Self::TOLERANCE {
            self.target
        } else {
            current + self.step.copysign(delta)
        };
        next.clamp(0.0, 1.0)
    }

    #[inline]
    pub fn is_settled(&self, current: f32) -> bool {
        current == self.target
    }
}

/// Create a connected control/playback pair.
///
/// `queue_size` bounds how many updates may be pending between two blocks.
pub fn channel(initial: Params, ramp_step: f32, queue_size: usize) -> (ParamHandle, ParamStore) {
    let (sender, receiver) = RingBuffer::new(queue_size.max(1));
    let published = Arc::new(AtomicU32::new(initial.volume.to_bits()));

    let handle = ParamHandle {
        sender,
        requested: initial,
        volume: published.clone(),
    };
    let store = ParamStore {
        receiver,
        current: initial,
        ramp: VolumeRamp::new(initial.volume, ramp_step),
        volume: published,
    };
    (handle, store)
}

/// Control-side access to the parameter store.
///
/// Every setter validates, then queues the change without blocking. Values
/// take effect at the start of the next block.
pub struct ParamHandle {
    sender: Producer<ParamMessage>,
    /// What the control path last asked for (volume = ramp target)
    requested: Params,
    volume: Arc<AtomicU32>,
}

impl ParamHandle {
    /// Validate and queue a message.
    ///
    /// Nothing is recorded if validation fails or the queue is full.
    pub fn send(&mut self, msg: ParamMessage) -> Result<(), CommandError> {
        msg.validate()?;
        self.sender
            .push(msg)
            .map_err(|rtrb::PushError::Full(_)| CommandError::QueueFull)?;

        match msg {
            ParamMessage::SetTargetVolume(v) => self.requested.volume = v,
            other => other.apply(&mut self.requested),
        }
        Ok(())
    }

    /// Start a smooth transition to `volume`. Returns immediately.
    pub fn set_target_volume(&mut self, volume: f32) -> Result<(), CommandError> {
        self.send(ParamMessage::SetTargetVolume(volume))
    }

    pub fn set_band_gain(&mut self, band: Band, gain: f32) -> Result<(), CommandError> {
        self.send(ParamMessage::SetBandGain(band, gain))
    }

    pub fn set_band_gains(&mut self, gains: BandGains) -> Result<(), CommandError> {
        self.send(ParamMessage::SetBandGains(gains))
    }

    pub fn set_threshold(&mut self, threshold: f32) -> Result<(), CommandError> {
        self.send(ParamMessage::SetThreshold(threshold))
    }

    pub fn set_ratio(&mut self, ratio: f32) -> Result<(), CommandError> {
        self.send(ParamMessage::SetRatio(ratio))
    }

    /// Last requested values; `volume` is the ramp target.
    #[inline]
    pub fn requested(&self) -> &Params {
        &self.requested
    }

    /// Volume the playback path used for its most recent block.
    #[inline]
    pub fn current_volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }
}

/// Playback-side end of the parameter store.
pub struct ParamStore {
    receiver: Consumer<ParamMessage>,
    current: Params,
    ramp: VolumeRamp,
    volume: Arc<AtomicU32>,
}

impl ParamStore {
    /// Apply every pending update, in order.
    pub fn drain_messages(&mut self) {
        // split borrow: receiver vs. the rest of self
        let receiver = &mut self.receiver;
        let messages = core::iter::from_fn(|| receiver.pop().ok());
        for msg in messages {
            trace!(?msg, "parameter update");
            match msg {
                ParamMessage::SetTargetVolume(v) => self.ramp.set_target(v),
                ParamMessage::SetVolume(v) => {
                    self.ramp.set_target(v);
                    self.current.volume = v;
                }
                other => other.apply(&mut self.current),
            }
        }
    }

    /// Move volume one step toward the ramp target and publish it.
    pub fn advance_ramp(&mut self) {
        self.current.volume = self.ramp.advance(self.current.volume);
        self.volume
            .store(self.current.volume.to_bits(), Ordering::Relaxed);
    }

    /// Drain, advance the ramp once, and return the block's snapshot.
    pub fn next_snapshot(&mut self) -> Params {
        self.drain_messages();
        self.advance_ramp();
        self.current
    }

    #[inline]
    pub fn current(&self) -> &Params {
        &self.current
    }

    #[inline]
    pub fn ramp(&self) -> &VolumeRamp {
        &self.ramp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_to(from: f32, to: f32) -> (f32, usize) {
        let ramp = VolumeRamp::new(to, 0.01);
        let mut volume = from;
        let mut steps = 0;
        while !ramp.is_settled(volume) {
            let next = ramp.advance(volume);
            // monotonic, never past the target
            if to < from {
                assert!(next <= volume && next >= to, "{} -> {}", volume, next);
            } else {
                assert!(next >= volume && next <= to, "{} -> {}", volume, next);
            }
            volume = next;
            steps += 1;
            assert!(steps < 1000, "ramp did not converge");
        }
        (volume, steps)
    }

    #[test]
    fn ramp_down_converges_exactly() {
        let (volume, steps) = ramp_to(1.0, 0.2);
        assert_eq!(volume, 0.2);
        assert!((80..=81).contains(&steps), "steps = {}", steps);
    }

    #[test]
    fn ramp_up_and_down_between_midpoints() {
        let (up, up_steps) = ramp_to(0.3, 0.7);
        assert_eq!(up, 0.7);
        assert!((40..=41).contains(&up_steps));

        let (down, down_steps) = ramp_to(0.7, 0.3);
        assert_eq!(down, 0.3);
        assert!((40..=41).contains(&down_steps));
    }

    #[test]
    fn zero_step_is_immediate() {
        let ramp = VolumeRamp::new(0.25, 0.0);
        assert_eq!(ramp.advance(1.0), 0.25);
    }

    #[test]
    fn non_finite_step_is_immediate() {
        for step in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let ramp = VolumeRamp::new(0.25, step);
            assert_eq!(ramp.step(), 0.0);
            assert_eq!(ramp.advance(1.0), 0.25);
        }

        let (mut handle, mut store) = channel(Params::default(), f32::NAN, 8);
        handle.set_target_volume(0.4).unwrap();
        assert_eq!(store.next_snapshot().volume, 0.4);
        assert_eq!(handle.current_volume(), 0.4);
    }

    #[test]
    fn out_of_range_values_are_rejected_and_not_queued() {
        let (mut handle, mut store) = channel(Params::default(), 0.01, 8);

        assert!(matches!(
            handle.set_target_volume(1.5),
            Err(CommandError::InvalidParameterValue { name: "volume", .. })
        ));
        assert!(handle.set_band_gain(Band::Mid, -1.01).is_err());
        assert!(handle.set_band_gain(Band::Treble, f32::NAN).is_err());
        assert!(handle.set_threshold(0.0).is_err());
        assert!(handle.set_ratio(0.5).is_err());

        assert_eq!(*handle.requested(), Params::default());
        assert_eq!(store.next_snapshot(), Params::default());
    }

    #[test]
    fn full_queue_reports_and_keeps_requested_state() {
        let (mut handle, _store) = channel(Params::default(), 0.01, 2);
        handle.set_band_gain(Band::Bass, 0.1).unwrap();
        handle.set_band_gain(Band::Bass, 0.2).unwrap();
        assert_eq!(handle.set_band_gain(Band::Bass, 0.3), Err(CommandError::QueueFull));
        assert_eq!(handle.requested().gains.bass, 0.2);
    }

    #[test]
    fn updates_apply_in_order_at_block_start() {
        let (mut handle, mut store) = channel(Params::default(), 0.01, 16);
        handle.set_band_gain(Band::Bass, 0.4).unwrap();
        handle.set_band_gains(BandGains::uniform(-0.5)).unwrap();
        handle.set_band_gain(Band::Treble, 0.9).unwrap();
        handle.set_threshold(0.8).unwrap();
        handle.set_ratio(2.0).unwrap();

        let snapshot = store.next_snapshot();
        assert_eq!(snapshot.gains.bass, -0.5);
        assert_eq!(snapshot.gains.mid, -0.5);
        assert_eq!(snapshot.gains.treble, 0.9);
        assert_eq!(snapshot.compression_threshold, 0.8);
        assert_eq!(snapshot.compression_ratio, 2.0);
        assert_eq!(*handle.requested(), snapshot);
    }

    #[test]
    fn target_volume_ramps_one_step_per_block_and_publishes() {
        let (mut handle, mut store) = channel(Params::default(), 0.01, 16);
        handle.set_target_volume(0.2).unwrap();
        assert_eq!(handle.requested().volume, 0.2);

        let first = store.next_snapshot();
        assert!((first.volume - 0.99).abs() < 1e-6);
        assert_eq!(handle.current_volume(), first.volume);

        let mut blocks = 1;
        while store.current().volume != 0.2 {
            store.next_snapshot();
            blocks += 1;
            assert!(blocks < 200);
        }
        assert_eq!(handle.current_volume(), 0.2);
    }

    #[test]
    fn immediate_volume_cancels_ramp() {
        let (mut handle, mut store) = channel(Params::default(), 0.01, 16);
        handle.set_target_volume(0.0).unwrap();
        store.next_snapshot();
        handle.send(ParamMessage::SetVolume(0.6)).unwrap();
        assert_eq!(store.next_snapshot().volume, 0.6);
        assert_eq!(store.next_snapshot().volume, 0.6);
        assert_eq!(store.ramp().target(), 0.6);
    }
}
