use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{ChartKind, FieldMapping};
use crate::layout::{GridConfig, LayoutConfig, LayoutTuning, Margins};
use crate::render::{Color, ColorSource, CyclePalette};
use crate::transition::TransitionOverrides;

/// Declarative configuration of one narrative step's chart.
///
/// Serializable so step definitions can live next to their datasets; every
/// field except `kind` has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
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
    #[serde(default)]
    pub transitions: TransitionOverrides,
    #[serde(default)]
    pub min_margins: Margins,
    #[serde(default = "default_min_inner")]
    pub min_inner_width: f64,
    #[serde(default = "default_min_inner")]
    pub min_inner_height: f64,
    /// Required for `grid` charts.
    #[serde(default)]
    pub grid: Option<GridConfig>,
    /// Morph line series point by point instead of rebinding them.
    #[serde(default)]
    pub smooth_update: bool,
    #[serde(default = "default_diff_duration_ms")]
    pub diff_duration_ms: f64,
    #[serde(default = "default_point_radius")]
    pub point_radius: f64,
    /// `#rrggbb` colors replacing the default palette.
    #[serde(default)]
    pub palette: Vec<String>,
    #[serde(default)]
    pub layout_tuning: LayoutTuning,
}

fn default_min_inner() -> f64 {
    50.0
}

fn default_diff_duration_ms() -> f64 {
    1000.0
}

fn default_point_radius() -> f64 {
    4.0
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self::new(ChartKind::Line)
    }
}

impl ChartConfig {
    #[must_use]
    pub fn new(kind: ChartKind) -> Self {
        Self {
            kind,
            fields: FieldMapping::default(),
            title: None,
            subtitle: None,
            show_legend: false,
            transitions: TransitionOverrides::default(),
            min_margins: Margins::default(),
            min_inner_width: default_min_inner(),
            min_inner_height: default_min_inner(),
            grid: None,
            smooth_update: false,
            diff_duration_ms: default_diff_duration_ms(),
            point_radius: default_point_radius(),
            palette: Vec::new(),
            layout_tuning: LayoutTuning::default(),
        }
    }

    #[must_use]
    pub fn with_fields(mut self, fields: FieldMapping) -> Self {
        self.fields = fields;
        self
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
    pub fn with_transitions(mut self, transitions: TransitionOverrides) -> Self {
        self.transitions = transitions;
        self
    }

    #[must_use]
    pub fn with_min_margins(mut self, min_margins: Margins) -> Self {
        self.min_margins = min_margins;
        self
    }

    #[must_use]
    pub fn with_grid(mut self, grid: GridConfig) -> Self {
        self.grid = Some(grid);
        self
    }

    #[must_use]
    pub fn with_smooth_update(mut self, smooth_update: bool) -> Self {
        self.smooth_update = smooth_update;
        self
    }

    #[must_use]
    pub fn with_diff_duration_ms(mut self, diff_duration_ms: f64) -> Self {
        self.diff_duration_ms = diff_duration_ms;
        self
    }

    #[must_use]
    pub fn with_palette(mut self, palette: Vec<String>) -> Self {
        self.palette = palette;
        self
    }

    /// Layout engine view of this configuration.
    #[must_use]
    pub fn layout_config(&self) -> LayoutConfig {
        LayoutConfig {
            kind: self.kind,
            fields: self.fields.clone(),
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            show_legend: self.show_legend,
            min_margins: self.min_margins,
            min_inner_width: self.min_inner_width,
            min_inner_height: self.min_inner_height,
            tuning: self.layout_tuning,
        }
    }

    /// Palette built from `palette`, or `None` to keep the current source.
    ///
    /// Entries that are not hex colors are skipped; validation rejects them
    /// before a render step gets here.
    #[must_use]
    pub fn color_source(&self) -> Option<Arc<dyn ColorSource>> {
        if self.palette.is_empty() {
            return None;
        }
        let colors: Vec<Color> = self
            .palette
            .iter()
            .filter_map(|hex| Color::from_hex(hex))
            .collect();
        Some(Arc::new(CyclePalette::new(colors)))
    }
}
