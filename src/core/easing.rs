use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Timing curve applied to normalized transition progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicIn,
    CubicOut,
    #[default]
    CubicInOut,
    SinInOut,
    BackOut,
    ElasticOut,
}

impl Easing {
    /// Maps progress `t` in `[0, 1]` to eased progress.
    ///
    /// Input is clamped; `BackOut` and `ElasticOut` may overshoot 1 in between
    /// but always end exactly at 0 and 1.
    #[must_use]
    pub fn apply(self, t: f64) -> f64 {
        let t = if t.is_nan() { 1.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Self::Linear => t,
            Self::QuadIn => t * t,
            Self::QuadOut => t * (2.0 - t),
            Self::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Self::CubicIn => t * t * t,
            Self::CubicOut => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
            Self::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = 2.0 * t - 2.0;
                    0.5 * u * u * u + 1.0
                }
            }
            Self::SinInOut => (1.0 - (PI * t).cos()) / 2.0,
            Self::BackOut => {
                const OVERSHOOT: f64 = 1.70158;
                let u = t - 1.0;
                u * u * ((OVERSHOOT + 1.0) * u + OVERSHOOT) + 1.0
            }
            Self::ElasticOut => {
                if t == 0.0 || t == 1.0 {
                    return t;
                }
                let period = 0.3;
                2f64.powf(-10.0 * t) * ((t - period / 4.0) * (2.0 * PI) / period).sin() + 1.0
            }
        }
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|ch| ch.is_ascii_alphanumeric())
            .map(|ch| ch.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "linear" => Some(Self::Linear),
            "quadin" => Some(Self::QuadIn),
            "quadout" => Some(Self::QuadOut),
            "quadinout" | "quad" => Some(Self::QuadInOut),
            "cubicin" => Some(Self::CubicIn),
            "cubicout" => Some(Self::CubicOut),
            "cubicinout" | "cubic" | "easeinout" => Some(Self::CubicInOut),
            "sininout" | "sin" => Some(Self::SinInOut),
            "backout" => Some(Self::BackOut),
            "elasticout" | "elastic" => Some(Self::ElasticOut),
            _ => None,
        }
    }
}

/// Linear interpolation of scalars.
#[inline]
#[must_use]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const ALL: [Easing; 10] = [
        Easing::Linear,
        Easing::QuadIn,
        Easing::QuadOut,
        Easing::QuadInOut,
        Easing::CubicIn,
        Easing::CubicOut,
        Easing::CubicInOut,
        Easing::SinInOut,
        Easing::BackOut,
        Easing::ElasticOut,
    ];

    #[test]
    fn every_curve_hits_endpoints() {
        for easing in ALL {
            assert_abs_diff_eq!(easing.apply(0.0), 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(easing.apply(1.0), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn cubic_in_out_is_symmetric_at_midpoint() {
        assert_abs_diff_eq!(Easing::CubicInOut.apply(0.5), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(Easing::CubicInOut.apply(0.25), 0.0625, epsilon = 1e-12);
    }

    #[test]
    fn parse_accepts_common_spellings() {
        assert_eq!(Easing::parse("ease-in-out"), Some(Easing::CubicInOut));
        assert_eq!(Easing::parse("cubicOut"), Some(Easing::CubicOut));
        assert_eq!(Easing::parse("bounce"), None);
    }
}
