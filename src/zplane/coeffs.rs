//! Pole interpolation and pole-to-biquad conversion

use std::f64::consts::PI;

use super::model::Pole;

/// Largest allowed |a1|
pub const A1_LIMIT: f64 = 1.999;

/// Largest allowed |a2|
pub const A2_LIMIT: f64 = 0.999;

/// Distance kept from the edge of the stability triangle (|a1| < 1 + a2)
const TRIANGLE_MARGIN: f64 = 1e-4;

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BiquadCoeffs {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl BiquadCoeffs {
    /// Band-pass section for a pole pair, with zeros at DC and Nyquist.
    ///
    /// `a1` and `a2` are clamped to `±1.999` and `±0.999`. Once the `a2` clamp
    /// has engaged the pair can sit on the triangle edge; `a1` is then pulled
    /// just inside it.
    pub fn from_pole(pole: Pole) -> Self {
        let r = f64::from(pole.r);
        let theta = f64::from(pole.theta);

        let a2 = (r * r).clamp(-A2_LIMIT, A2_LIMIT);
        let mut a1 = (-2.0 * r * theta.cos()).clamp(-A1_LIMIT, A1_LIMIT);
        if a2 >= A2_LIMIT && a1.abs() > 1.0 + a2 - TRIANGLE_MARGIN {
            a1 = a1.signum() * (1.0 + a2 - TRIANGLE_MARGIN);
        }

        // Gain compensation grows as the pole approaches the unit circle
        let b0 = (1.0 - r) * 0.5;

        Self {
            b0: b0 as f32,
            b1: 0.0,
            b2: (-b0) as f32,
            a1: a1 as f32,
            a2: a2 as f32,
        }
    }

    /// Stability triangle test: |a2| < 1 and |a1| < 1 + a2
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }

    /// Coefficients in serialization order
    pub fn to_array(&self) -> [f32; 5] {
        [self.b0, self.b1, self.b2, self.a1, self.a2]
    }

    pub fn from_array(v: [f32; 5]) -> Self {
        Self {
            b0: v[0],
            b1: v[1],
            b2: v[2],
            a1: v[3],
            a2: v[4],
        }
    }

    /// Linear blend towards `other`
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        let mix = |a: f32, b: f32| a + (b - a) * t;
        Self {
            b0: mix(self.b0, other.b0),
            b1: mix(self.b1, other.b1),
            b2: mix(self.b2, other.b2),
            a1: mix(self.a1, other.a1),
            a2: mix(self.a2, other.a2),
        }
    }
}

/// Wrap an angle difference into (-π, π]
fn wrap_angle(mut diff: f64) -> f64 {
    while diff > PI {
        diff -= 2.0 * PI;
    }
    while diff <= -PI {
        diff += 2.0 * PI;
    }
    diff
}

/// Interpolate between two poles.
///
/// Radius moves linearly; the angle follows the shortest signed path.
pub fn interpolate_pole(a: Pole, b: Pole, t: f32) -> Pole {
    let t = f64::from(t);
    let (ra, rb) = (f64::from(a.r), f64::from(b.r));
    let (ta, tb) = (f64::from(a.theta), f64::from(b.theta));

    let r = ra + t * (rb - ra);
    let theta = ta + t * wrap_angle(tb - ta);
    Pole::new(r as f32, theta as f32)
}
