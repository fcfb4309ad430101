use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::core::easing::lerp;

/// Start/end angle pair of one arc, in radians clockwise from 12 o'clock.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ArcAngles {
    pub start_angle: f64,
    pub end_angle: f64,
}

impl ArcAngles {
    pub const COLLAPSED: Self = Self {
        start_angle: 0.0,
        end_angle: 0.0,
    };

    #[must_use]
    pub fn new(start_angle: f64, end_angle: f64) -> Self {
        Self {
            start_angle,
            end_angle,
        }
    }

    /// Interpolates both angles independently.
    ///
    /// Tweening the pair (instead of the sweep) keeps arcs from spinning around
    /// the circle when a slice changes sign or wraps.
    #[must_use]
    pub fn interpolate(self, to: Self, t: f64) -> Self {
        Self {
            start_angle: lerp(self.start_angle, to.start_angle, t),
            end_angle: lerp(self.end_angle, to.end_angle, t),
        }
    }

    #[must_use]
    pub fn sweep(self) -> f64 {
        self.end_angle - self.start_angle
    }

    #[must_use]
    pub fn mid_angle(self) -> f64 {
        (self.start_angle + self.end_angle) * 0.5
    }
}

/// One laid-out pie slice.
#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
    pub angles: ArcAngles,
}

/// Lays out `(label, value)` pairs around a full circle in input order.
///
/// Negative and non-finite values contribute a zero-width slice. When every
/// value is zero all slices collapse at angle 0.
#[must_use]
pub fn pie_layout(values: &[(String, f64)]) -> Vec<PieSlice> {
    let total: f64 = values
        .iter()
        .map(|(_, value)| sanitize(*value))
        .sum();

    let mut cursor = 0.0;
    values
        .iter()
        .map(|(label, value)| {
            let value = sanitize(*value);
            let sweep = if total > 0.0 { value / total * TAU } else { 0.0 };
            let angles = ArcAngles::new(cursor, cursor + sweep);
            cursor += sweep;
            PieSlice {
                label: label.clone(),
                value,
                angles,
            }
        })
        .collect()
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn slices_cover_the_full_circle() {
        let slices = pie_layout(&[("a".into(), 1.0), ("b".into(), 3.0)]);
        assert_abs_diff_eq!(slices[0].angles.end_angle, TAU / 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(slices[1].angles.end_angle, TAU, epsilon = 1e-12);
    }

    #[test]
    fn negative_values_collapse() {
        let slices = pie_layout(&[("a".into(), -5.0), ("b".into(), 2.0)]);
        assert_eq!(slices[0].angles.sweep(), 0.0);
        assert_abs_diff_eq!(slices[1].angles.sweep(), TAU, epsilon = 1e-12);
    }
}
