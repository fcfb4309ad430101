//! Margin, legend and grid geometry derived from data statistics.
//!
//! Every function here is pure and total: pathological input degrades to a
//! usable layout instead of an error.

mod format;
mod grid;
mod legend;

pub use format::{format_value, group_thousands};
pub use grid::{GridCell, GridConfig, MAX_GRID_CELLS, compute_grid_cells};
pub use legend::{LegendGeometry, LegendItem, compute_legend};

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::{ChartKind, Dataset, FieldMapping, Viewport, coerce_number};

/// Four-sided spacing in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    #[must_use]
    pub const fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Base margins per chart kind; grid panels reuse the line table.
    #[must_use]
    pub const fn base_for(kind: ChartKind) -> Self {
        match kind {
            ChartKind::Line | ChartKind::Area | ChartKind::Grid => {
                Self::new(50.0, 30.0, 50.0, 60.0)
            }
            ChartKind::Bar => Self::new(50.0, 20.0, 60.0, 60.0),
            ChartKind::Pie => Self::new(40.0, 40.0, 40.0, 40.0),
            ChartKind::Scatter => Self::new(50.0, 40.0, 50.0, 60.0),
        }
    }

    fn scaled(self, factor: f64) -> Self {
        Self::new(
            self.top * factor,
            self.right * factor,
            self.bottom * factor,
            self.left * factor,
        )
    }

    fn max(self, other: Self) -> Self {
        Self::new(
            self.top.max(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
            self.left.max(other.left),
        )
    }

    /// Replaces negative and non-finite sides with zero.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let clean = |value: f64| if value.is_finite() { value.max(0.0) } else { 0.0 };
        Self::new(
            clean(self.top),
            clean(self.right),
            clean(self.bottom),
            clean(self.left),
        )
    }
}

/// Pixel estimates used when sizing text-driven margins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutTuning {
    /// Legend glyph width per character of a series name.
    pub char_width_px: f64,
    pub legend_padding_px: f64,
    /// Axis tick glyph width per formatted character.
    pub glyph_width_px: f64,
    pub negative_sign_px: f64,
    pub axis_title_px: f64,
    pub subtitle_px: f64,
}

impl Default for LayoutTuning {
    fn default() -> Self {
        Self {
            char_width_px: 8.0,
            legend_padding_px: 40.0,
            glyph_width_px: 7.0,
            negative_sign_px: 8.0,
            axis_title_px: 20.0,
            subtitle_px: 20.0,
        }
    }
}

/// Declarative inputs of the layout engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub kind: ChartKind,
    #[serde(default)]
    pub fields: FieldMapping,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub show_legend: bool,
    /// Caller floor for every margin side.
    #[serde(default)]
    pub min_margins: Margins,
    #[serde(default = "default_min_inner")]
    pub min_inner_width: f64,
    #[serde(default = "default_min_inner")]
    pub min_inner_height: f64,
    #[serde(default)]
    pub tuning: LayoutTuning,
}

fn default_min_inner() -> f64 {
    50.0
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            kind: ChartKind::Line,
            fields: FieldMapping::default(),
            title: None,
            subtitle: None,
            show_legend: false,
            min_margins: Margins::default(),
            min_inner_width: default_min_inner(),
            min_inner_height: default_min_inner(),
            tuning: LayoutTuning::default(),
        }
    }
}

impl LayoutConfig {
    #[must_use]
    pub fn new(kind: ChartKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    #[must_use]
    pub fn with_legend(mut self, show_legend: bool) -> Self {
        self.show_legend = show_legend;
        self
    }

    #[must_use]
    pub fn with_min_margins(mut self, min_margins: Margins) -> Self {
        self.min_margins = min_margins;
        self
    }

    #[must_use]
    pub fn with_min_inner_size(mut self, width: f64, height: f64) -> Self {
        self.min_inner_width = width;
        self.min_inner_height = height;
        self
    }
}

/// Margins and inner drawing area of one chart render.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutMetrics {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
    pub inner_width: f64,
    pub inner_height: f64,
}

impl LayoutMetrics {
    #[must_use]
    pub fn margins(self) -> Margins {
        Margins::new(self.top, self.right, self.bottom, self.left)
    }

    #[must_use]
    pub fn outer_width(self) -> f64 {
        self.left + self.inner_width + self.right
    }

    #[must_use]
    pub fn outer_height(self) -> f64 {
        self.top + self.inner_height + self.bottom
    }
}

/// Statistics of a dataset that drive margin sizing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataStats {
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub has_negative: bool,
    pub has_decimal: bool,
    pub series_count: usize,
    pub max_series_name_len: usize,
    pub x_span: f64,
    pub title_len: usize,
}

impl DataStats {
    /// Value with the widest magnitude, if any numeric value exists.
    #[must_use]
    pub fn largest_magnitude(&self) -> Option<f64> {
        match (self.min_value, self.max_value) {
            (Some(min), Some(max)) => Some(if min.abs() > max.abs() { min } else { max }),
            (Some(value), None) | (None, Some(value)) => Some(value),
            (None, None) => None,
        }
    }
}

/// Scans `dataset` once and collects the layout-relevant statistics.
#[must_use]
pub fn analyze_dataset(dataset: &Dataset, config: &LayoutConfig) -> DataStats {
    let fields = &config.fields;
    let mut stats = DataStats {
        title_len: config.title.as_deref().map_or(0, |t| t.chars().count()),
        ..DataStats::default()
    };

    let mut series_names: HashSet<String> = HashSet::new();
    let mut categories: HashSet<String> = HashSet::new();
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut all_x_numeric = true;

    for row in dataset.iter() {
        if let Some(value) = row.get(&fields.y).and_then(coerce_number) {
            stats.min_value = Some(stats.min_value.map_or(value, |min| min.min(value)));
            stats.max_value = Some(stats.max_value.map_or(value, |max| max.max(value)));
            stats.has_negative |= value < 0.0;
            stats.has_decimal |= value.fract() != 0.0;
        }

        if let Some(x) = row.get(&fields.x) {
            match coerce_number(x) {
                Some(value) => {
                    x_min = x_min.min(value);
                    x_max = x_max.max(value);
                }
                None if !x.is_missing() => {
                    all_x_numeric = false;
                    categories.insert(x.to_string());
                }
                None => {}
            }
        }

        series_names.insert(fields.series_name(row));
    }

    stats.series_count = series_names.len();
    stats.max_series_name_len = series_names
        .iter()
        .map(|name| name.chars().count())
        .max()
        .unwrap_or(0);
    stats.x_span = if all_x_numeric {
        if x_max >= x_min { x_max - x_min } else { 0.0 }
    } else {
        categories.len() as f64
    };
    stats
}

/// Computes margins and the inner drawing area for one render.
///
/// Deterministic and total: the same inputs always give the same metrics,
/// every side is at least the caller minimum, and the inner area never drops
/// below `min_inner_width` x `min_inner_height`.
#[must_use]
pub fn compute_margins(
    dataset: &Dataset,
    config: &LayoutConfig,
    screen: Viewport,
) -> LayoutMetrics {
    let stats = analyze_dataset(dataset, config);
    let tuning = config.tuning;
    let base = Margins::base_for(config.kind);
    let mut margins = base;

    if stats.title_len > 30 {
        margins.top += 20.0;
    } else if stats.title_len > 15 {
        margins.top += 10.0;
    }
    if config.subtitle.as_deref().is_some_and(|s| !s.trim().is_empty()) {
        margins.top += tuning.subtitle_px;
    }

    if config.show_legend && stats.series_count > 1 {
        let legend_width =
            stats.max_series_name_len as f64 * tuning.char_width_px + tuning.legend_padding_px;
        margins.right = base.right.max(legend_width);
    }

    if stats.x_span > 30.0 {
        margins.bottom += 30.0;
    } else if stats.x_span > 20.0 {
        margins.bottom += 20.0;
    } else if stats.x_span > 10.0 {
        margins.bottom += 10.0;
    }

    if config.kind != ChartKind::Pie {
        if let Some(widest) = stats.largest_magnitude() {
            let label = format_value(widest);
            let label_width = label.trim_start_matches('-').chars().count() as f64
                * tuning.glyph_width_px;
            let sign_width = if stats.has_negative {
                tuning.negative_sign_px
            } else {
                0.0
            };
            margins.left = base.left.max(label_width + sign_width + tuning.axis_title_px);
        }
    }

    let margins = apply_responsive(margins, screen.width)
        .sanitized()
        .max(config.min_margins.sanitized());

    let min_inner_width = non_negative(config.min_inner_width);
    let min_inner_height = non_negative(config.min_inner_height);
    LayoutMetrics {
        top: margins.top,
        right: margins.right,
        bottom: margins.bottom,
        left: margins.left,
        inner_width: (f64::from(screen.width) - margins.left - margins.right).max(min_inner_width),
        inner_height: (f64::from(screen.height) - margins.top - margins.bottom)
            .max(min_inner_height),
    }
}

const NARROW_BREAKPOINT_PX: u32 = 480;
const MEDIUM_BREAKPOINT_PX: u32 = 768;
const NARROW_MINIMUMS: Margins = Margins::new(20.0, 10.0, 30.0, 35.0);
const MEDIUM_MINIMUMS: Margins = Margins::new(30.0, 15.0, 35.0, 45.0);

fn apply_responsive(margins: Margins, screen_width: u32) -> Margins {
    if screen_width < NARROW_BREAKPOINT_PX {
        margins.scaled(0.6).max(NARROW_MINIMUMS)
    } else if screen_width < MEDIUM_BREAKPOINT_PX {
        margins.scaled(0.8).max(MEDIUM_MINIMUMS)
    } else {
        margins
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::row;

    fn wide() -> Viewport {
        Viewport::new(1200, 800)
    }

    #[test]
    fn long_title_adds_twenty_pixels() {
        let config = LayoutConfig::new(ChartKind::Line).with_title("a".repeat(35));
        let metrics = compute_margins(&Dataset::default(), &config, wide());
        assert_eq!(metrics.top, 70.0);
    }

    #[test]
    fn medium_title_and_subtitle_stack() {
        let config = LayoutConfig::new(ChartKind::Line)
            .with_title("a".repeat(20))
            .with_subtitle("sub");
        let metrics = compute_margins(&Dataset::default(), &config, wide());
        assert_eq!(metrics.top, 80.0);
    }

    #[test]
    fn wide_x_span_grows_bottom_margin() {
        let dataset = Dataset::new(vec![
            row([("year", 1990.into()), ("value", 1.into())]),
            row([("year", 2015.into()), ("value", 2.into())]),
        ]);
        let metrics = compute_margins(&dataset, &LayoutConfig::new(ChartKind::Line), wide());
        assert_eq!(metrics.bottom, 70.0);
    }

    #[test]
    fn left_margin_tracks_formatted_label_width() {
        let dataset = Dataset::new(vec![
            row([("year", 2000.into()), ("value", (-123_456_789.0).into())]),
            row([("year", 2001.into()), ("value", 5.into())]),
        ]);
        let config = LayoutConfig::new(ChartKind::Bar);
        let metrics = compute_margins(&dataset, &config, wide());
        // "-123.5M" -> 6 glyphs * 7 + 8 sign + 20 title = 70
        assert_eq!(metrics.left, 70.0);
    }

    #[test]
    fn narrow_screens_shrink_margins_to_breakpoint_floor() {
        let config = LayoutConfig::new(ChartKind::Line);
        let metrics = compute_margins(&Dataset::default(), &config, Viewport::new(400, 600));
        assert_eq!(metrics.top, 30.0);
        assert_eq!(metrics.right, 18.0);
        assert_eq!(metrics.bottom, 30.0);
        assert_eq!(metrics.left, 36.0);
    }

    #[test]
    fn inner_area_never_collapses() {
        let config = LayoutConfig::new(ChartKind::Line).with_min_inner_size(120.0, 80.0);
        let metrics = compute_margins(&Dataset::default(), &config, Viewport::new(10, 10));
        assert_eq!(metrics.inner_width, 120.0);
        assert_eq!(metrics.inner_height, 80.0);
    }
}
