//! Butterworth filter sections

use std::f64::consts::{FRAC_1_SQRT_2, PI, SQRT_2};

use num_complex::Complex64;

/// Normalized biquad coefficients (`a0 == 1`)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Prewarped analog frequency for a cutoff given as a fraction of Nyquist.
    fn prewarp(normalized: f64) -> f64 {
        (PI * normalized.clamp(1e-6, 0.999_999) / 2.0).tan()
    }

    /// Butterworth lowpass. `normalized` is the cutoff divided by Nyquist.
    pub fn lowpass(normalized: f64) -> Self {
        let k = Self::prewarp(normalized);
        let k2 = k * k;
        let norm = 1.0 / (1.0 + SQRT_2 * k + k2);
        Self {
            b0: k2 * norm,
            b1: 2.0 * k2 * norm,
            b2: k2 * norm,
            a1: 2.0 * (k2 - 1.0) * norm,
            a2: (1.0 - SQRT_2 * k + k2) * norm,
        }
    }

    /// Butterworth highpass. `normalized` is the cutoff divided by Nyquist.
    pub fn highpass(normalized: f64) -> Self {
        let k = Self::prewarp(normalized);
        let k2 = k * k;
        let norm = 1.0 / (1.0 + SQRT_2 * k + k2);
        Self {
            b0: norm,
            b1: -2.0 * norm,
            b2: norm,
            a1: 2.0 * (k2 - 1.0) * norm,
            a2: (1.0 - SQRT_2 * k + k2) * norm,
        }
    }

    /// Fourth-order Butterworth bandpass as two cascaded sections.
    ///
    /// `low` and `high` are the -3 dB edges divided by Nyquist. Each pole of
    /// the second-order lowpass prototype maps to a pair of bandpass poles
    /// (s -> (s^2 + w0^2) / (s * bw)). Every section gets one zero at DC and
    /// one at Nyquist, and the gain is split so the cascade is unity at the
    /// center frequency.
    pub fn bandpass(low: f64, high: f64) -> [Self; 2] {
        let (w1, w2) = (Self::prewarp(low), Self::prewarp(high.max(low)));
        let center_sq = w1 * w2;
        let bw = (w2 - w1).max(1e-9);

        let prototype = Complex64::new(-FRAC_1_SQRT_2, FRAC_1_SQRT_2);
        let pb = prototype * bw;
        let disc = (pb * pb - 4.0 * center_sq).sqrt();

        let section = |s: Complex64| {
            // bilinear transform, frequencies already prewarped
            let z = (1.0 + s) / (1.0 - s);
            Self {
                b0: 1.0,
                b1: 0.0,
                b2: -1.0,
                a1: -2.0 * z.re,
                a2: z.norm_sqr(),
            }
        };
        let mut sections = [section((pb + disc) / 2.0), section((pb - disc) / 2.0)];

        let center = 2.0 * center_sq.sqrt().atan() / PI;
        let peak = sections[0].magnitude(center) * sections[1].magnitude(center);
        let gain = 1.0 / peak.sqrt();
        for c in sections.iter_mut() {
            c.b0 *= gain;
            c.b2 *= gain;
        }
        sections
    }

    /// Magnitude response at a frequency given as a fraction of Nyquist
    pub fn magnitude(&self, normalized: f64) -> f64 {
        let w = PI * normalized;
        let (c1, s1) = (w.cos(), -w.sin());
        let (c2, s2) = ((2.0 * w).cos(), -(2.0 * w).sin());
        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = self.b1 * s1 + self.b2 * s2;
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = self.a1 * s1 + self.a2 * s2;
        (num_re.hypot(num_im)) / (den_re.hypot(den_im))
    }
}

/// One biquad section with its own delay line.
///
/// Transposed direct form II. State is kept in `f64`: low cutoffs put the
/// poles very close to the unit circle and `f32` state drifts audibly.
#[derive(Clone, Copy, Debug, Default)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    s1: f64,
    s2: f64,
}

impl Biquad {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            s1: 0.0,
            s2: 0.0,
        }
    }

    #[inline]
    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let c = &self.coeffs;
        let x = input as f64;
        let y = c.b0 * x + self.s1;
        self.s1 = c.b1 * x - c.a1 * y + self.s2;
        self.s2 = c.b2 * x - c.a2 * y;
        y as f32
    }

    pub fn reset(&mut self) {
        self.s1 = 0.0;
        self.s2 = 0.0;
    }
}
