use serde::{Deserialize, Serialize};

use crate::core::DataPoint;
use crate::error::{VizError, VizResult};

/// Continuous domain-to-pixel mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearScale {
    domain_start: f64,
    domain_end: f64,
    range_start: f64,
    range_end: f64,
}

/// Padding rules for data-driven domains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleTuning {
    pub padding_ratio: f64,
    pub min_span_absolute: f64,
    /// Extends the domain so that zero is always visible.
    pub include_zero: bool,
}

impl Default for ScaleTuning {
    fn default() -> Self {
        Self {
            padding_ratio: 0.0,
            min_span_absolute: 1.0,
            include_zero: false,
        }
    }
}

impl LinearScale {
    pub fn new(domain_start: f64, domain_end: f64) -> VizResult<Self> {
        if !domain_start.is_finite() || !domain_end.is_finite() || domain_start == domain_end {
            return Err(VizError::InvalidData(
                "scale domain must be finite and non-zero".to_owned(),
            ));
        }

        Ok(Self {
            domain_start,
            domain_end,
            range_start: 0.0,
            range_end: 1.0,
        })
    }

    /// Builds a scale covering `[min, max]` that never fails.
    ///
    /// Empty, flat or non-finite extents are widened around their center (or
    /// around zero) by `tuning.min_span_absolute`.
    #[must_use]
    pub fn from_extent(min: f64, max: f64, tuning: ScaleTuning) -> Self {
        let (mut min, mut max) = match (min.is_finite(), max.is_finite()) {
            (true, true) if min <= max => (min, max),
            (true, true) => (max, min),
            (true, false) => (min, min),
            (false, true) => (max, max),
            (false, false) => (0.0, 0.0),
        };
        if tuning.include_zero {
            min = min.min(0.0);
            max = max.max(0.0);
        }

        let min_span = if tuning.min_span_absolute.is_finite() && tuning.min_span_absolute > 0.0 {
            tuning.min_span_absolute
        } else {
            1.0
        };
        if max - min < min_span {
            let center = (min + max) * 0.5;
            min = center - min_span * 0.5;
            max = center + min_span * 0.5;
        }

        let padding = if tuning.padding_ratio.is_finite() && tuning.padding_ratio > 0.0 {
            (max - min) * tuning.padding_ratio
        } else {
            0.0
        };
        let keep_zero_floor = tuning.include_zero && min == 0.0;
        Self {
            domain_start: if keep_zero_floor { min } else { min - padding },
            domain_end: max + padding,
            range_start: 0.0,
            range_end: 1.0,
        }
    }

    /// Fits the x extent of `points`.
    #[must_use]
    pub fn fit_x<'a>(points: impl IntoIterator<Item = &'a DataPoint>, tuning: ScaleTuning) -> Self {
        let (min, max) = extent(points.into_iter().map(|point| point.x));
        Self::from_extent(min, max, tuning)
    }

    /// Fits the y extent of `points`.
    #[must_use]
    pub fn fit_y<'a>(points: impl IntoIterator<Item = &'a DataPoint>, tuning: ScaleTuning) -> Self {
        let (min, max) = extent(points.into_iter().map(|point| point.y));
        Self::from_extent(min, max, tuning)
    }

    #[must_use]
    pub fn with_range(mut self, range_start: f64, range_end: f64) -> Self {
        self.range_start = range_start;
        self.range_end = range_end;
        self
    }

    #[must_use]
    pub fn domain(self) -> (f64, f64) {
        (self.domain_start, self.domain_end)
    }

    #[must_use]
    pub fn range(self) -> (f64, f64) {
        (self.range_start, self.range_end)
    }

    /// Maps a domain value into the output range.
    pub fn map(self, value: f64) -> VizResult<f64> {
        if !value.is_finite() {
            return Err(VizError::InvalidData("value must be finite".to_owned()));
        }
        let span = self.domain_end - self.domain_start;
        let normalized = (value - self.domain_start) / span;
        Ok(self.range_start + normalized * (self.range_end - self.range_start))
    }

    /// Maps an output coordinate back into the domain.
    pub fn invert(self, pixel: f64) -> VizResult<f64> {
        if !pixel.is_finite() {
            return Err(VizError::InvalidData("pixel must be finite".to_owned()));
        }
        let range_span = self.range_end - self.range_start;
        if range_span == 0.0 {
            return Ok(self.domain_start);
        }
        let normalized = (pixel - self.range_start) / range_span;
        Ok(self.domain_start + normalized * (self.domain_end - self.domain_start))
    }

    /// Returns evenly spaced "nice" tick values (1, 2, 5 x 10^n steps).
    #[must_use]
    pub fn ticks(self, count: usize) -> Vec<f64> {
        let (start, stop) = if self.domain_start <= self.domain_end {
            (self.domain_start, self.domain_end)
        } else {
            (self.domain_end, self.domain_start)
        };
        let step = tick_step(start, stop, count.max(1));
        if !step.is_finite() || step <= 0.0 {
            return vec![start];
        }

        let first = (start / step).ceil() as i64;
        let last = (stop / step).floor() as i64;
        (first..=last)
            .map(|index| {
                let tick = index as f64 * step;
                // Trim float noise such as 0.30000000000000004.
                (tick * 1e9).round() / 1e9
            })
            .collect()
    }
}

fn tick_step(start: f64, stop: f64, count: usize) -> f64 {
    let raw = (stop - start) / count as f64;
    if raw <= 0.0 || !raw.is_finite() {
        return 0.0;
    }
    let power = raw.log10().floor();
    let magnitude = 10f64.powf(power);
    let error = raw / magnitude;
    let factor = if error >= 7.07 {
        10.0
    } else if error >= 3.16 {
        5.0
    } else if error >= 1.41 {
        2.0
    } else {
        1.0
    };
    factor * magnitude
}

fn extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values
        .filter(|value| value.is_finite())
        .fold((f64::NAN, f64::NAN), |(min, max), value| {
            (
                if min.is_nan() { value } else { min.min(value) },
                if max.is_nan() { value } else { max.max(value) },
            )
        })
}

/// Categorical scale splitting a pixel range into equal bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandScale {
    domain: Vec<String>,
    range_start: f64,
    range_end: f64,
    padding_ratio: f64,
}

impl BandScale {
    #[must_use]
    pub fn new(domain: Vec<String>, range_start: f64, range_end: f64) -> Self {
        Self {
            domain,
            range_start,
            range_end,
            padding_ratio: 0.1,
        }
    }

    #[must_use]
    pub fn with_padding(mut self, padding_ratio: f64) -> Self {
        self.padding_ratio = padding_ratio.clamp(0.0, 0.95);
        self
    }

    #[must_use]
    pub fn domain(&self) -> &[String] {
        &self.domain
    }

    fn step(&self) -> f64 {
        if self.domain.is_empty() {
            return 0.0;
        }
        (self.range_end - self.range_start) / self.domain.len() as f64
    }

    #[must_use]
    pub fn bandwidth(&self) -> f64 {
        self.step() * (1.0 - self.padding_ratio)
    }

    /// Left edge of the band for `category`.
    #[must_use]
    pub fn position(&self, category: &str) -> Option<f64> {
        let index = self.domain.iter().position(|item| item == category)?;
        let step = self.step();
        Some(self.range_start + index as f64 * step + step * self.padding_ratio * 0.5)
    }
}

/// Horizontal axis mapping used by one chart.
#[derive(Debug, Clone, PartialEq)]
pub enum XScale {
    Linear(LinearScale),
    Band(BandScale),
}

/// Polar frame for arc charts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcFrame {
    pub center_x: f64,
    pub center_y: f64,
    pub inner_radius: f64,
    pub outer_radius: f64,
}

/// Everything an adapter needs to turn data into pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Scales {
    pub x: XScale,
    pub y: LinearScale,
    pub arc: Option<ArcFrame>,
    /// Offset of the plot area inside the full surface.
    pub origin: (f64, f64),
}

impl Scales {
    #[must_use]
    pub fn linear(x: LinearScale, y: LinearScale) -> Self {
        Self {
            x: XScale::Linear(x),
            y,
            arc: None,
            origin: (0.0, 0.0),
        }
    }

    #[must_use]
    pub fn with_origin(mut self, left: f64, top: f64) -> Self {
        self.origin = (left, top);
        self
    }

    #[must_use]
    pub fn with_arc(mut self, arc: ArcFrame) -> Self {
        self.arc = Some(arc);
        self
    }

    /// Maps a numeric x value; fails for band scales.
    pub fn map_x(&self, value: f64) -> VizResult<f64> {
        match &self.x {
            XScale::Linear(scale) => Ok(self.origin.0 + scale.map(value)?),
            XScale::Band(_) => Err(VizError::InvalidData(
                "numeric x requested from a band scale".to_owned(),
            )),
        }
    }

    pub fn map_y(&self, value: f64) -> VizResult<f64> {
        Ok(self.origin.1 + self.y.map(value)?)
    }

    /// Pixel y of the value baseline (zero clamped into the domain).
    #[must_use]
    pub fn baseline_y(&self) -> f64 {
        let (start, end) = self.y.domain();
        let zero = 0.0f64.clamp(start.min(end), start.max(end));
        self.map_y(zero).unwrap_or(self.origin.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_extent_widens_flat_domains() {
        let scale = LinearScale::from_extent(5.0, 5.0, ScaleTuning::default());
        assert_eq!(scale.domain(), (4.5, 5.5));

        let scale = LinearScale::from_extent(f64::NAN, f64::NAN, ScaleTuning::default());
        assert_eq!(scale.domain(), (-0.5, 0.5));
    }

    #[test]
    fn ticks_use_nice_steps() {
        let scale = LinearScale::new(0.0, 100.0).expect("scale");
        assert_eq!(scale.ticks(5), vec![0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);
    }

    #[test]
    fn band_positions_are_padded() {
        let band = BandScale::new(vec!["a".into(), "b".into()], 0.0, 200.0).with_padding(0.2);
        assert_eq!(band.bandwidth(), 80.0);
        assert_eq!(band.position("a"), Some(10.0));
        assert_eq!(band.position("b"), Some(110.0));
        assert_eq!(band.position("c"), None);
    }
}
