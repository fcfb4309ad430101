use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::animation::Tick;
use crate::binding::{
    AxisSide, BindContext, BindResult, Datum, EntityKey, LayerId, LayerKind, SeriesPoint,
    Surface, TickDatum, bind,
};
use crate::core::{ChartKind, DataPoint, LinearScale, ScaleTuning, Scales, Series, XScale};
use crate::error::{CollectingReporter, VizError, VizResult};
use crate::layout::{LayoutMetrics, format_value};
use crate::render::{
    AdapterCallbacks, ColorSource, CyclePalette, LineAdapter, PointAdapter, RenderAdapter,
    TextAdapter,
};
use crate::transition::{TransitionOverrides, TransitionPolicy, TransitionSpec};

/// Plot rectangle inside the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for PlotArea {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: 100.0,
            height: 100.0,
        }
    }
}

impl From<LayoutMetrics> for PlotArea {
    fn from(metrics: LayoutMetrics) -> Self {
        Self {
            left: metrics.left,
            top: metrics.top,
            width: metrics.inner_width,
            height: metrics.inner_height,
        }
    }
}

/// Mutable state of one chart target: the retained surface plus the point
/// lists line series currently display.
///
/// Scheduled diff steps receive `&mut ChartScene`.
pub struct ChartScene {
    pub surface: Surface,
    pub kind: ChartKind,
    pub policy: TransitionPolicy,
    pub colors: Arc<dyn ColorSource>,
    pub plot: PlotArea,
    pub point_radius: f64,
    pub stroke_width: f64,
    /// Draw the connecting path (off for scatter charts).
    pub show_path: bool,
    pub tick_count: usize,
    pub y_tuning: ScaleTuning,
    /// Recoverable errors raised while binding.
    pub diagnostics: CollectingReporter,
    displayed: IndexMap<String, Vec<DataPoint>>,
}

impl Default for ChartScene {
    fn default() -> Self {
        Self::new(TransitionPolicy::default(), Arc::new(CyclePalette::default()))
    }
}

impl fmt::Debug for ChartScene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartScene")
            .field("kind", &self.kind)
            .field("plot", &self.plot)
            .field("entities", &self.surface.entity_count())
            .field("displayed", &self.displayed.len())
            .finish()
    }
}

impl Tick for ChartScene {
    fn tick(&mut self, now_ms: f64) {
        self.surface.tick(now_ms);
    }
}

impl ChartScene {
    #[must_use]
    pub fn new(policy: TransitionPolicy, colors: Arc<dyn ColorSource>) -> Self {
        Self {
            surface: Surface::new(),
            kind: ChartKind::Line,
            policy,
            colors,
            plot: PlotArea::default(),
            point_radius: 4.0,
            stroke_width: 2.0,
            show_path: true,
            tick_count: 5,
            y_tuning: ScaleTuning {
                padding_ratio: 0.05,
                ..ScaleTuning::default()
            },
            diagnostics: CollectingReporter::default(),
            displayed: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn now_ms(&self) -> f64 {
        self.surface.now_ms()
    }

    /// Points a line series currently shows, in display order.
    #[must_use]
    pub fn displayed(&self, series: &str) -> Option<&[DataPoint]> {
        self.displayed.get(series).map(Vec::as_slice)
    }

    pub fn displayed_names(&self) -> impl Iterator<Item = &String> {
        self.displayed.keys()
    }

    pub fn set_displayed(&mut self, series: &str, points: Vec<DataPoint>) {
        self.displayed.insert(series.to_owned(), points);
    }

    pub fn clear_displayed(&mut self, series: &str) -> Option<Vec<DataPoint>> {
        self.displayed.shift_remove(series)
    }

    /// Drops the first displayed point at `x`; `false` if none matched.
    pub fn remove_point(&mut self, series: &str, x: f64) -> bool {
        let Some(points) = self.displayed.get_mut(series) else {
            return false;
        };
        match points.iter().position(|point| point.x == x) {
            Some(index) => {
                points.remove(index);
                true
            }
            None => false,
        }
    }

    /// Inserts `point` keeping ascending x order; an existing x is kept.
    pub fn insert_point(&mut self, series: &str, point: DataPoint) -> bool {
        let points = self.displayed.entry(series.to_owned()).or_default();
        if points.iter().any(|existing| existing.x == point.x) {
            return false;
        }
        let index = points
            .iter()
            .position(|existing| existing.x > point.x)
            .unwrap_or(points.len());
        points.insert(index, point);
        true
    }

    /// Scales fitted to the union of every displayed series.
    #[must_use]
    pub fn line_scales(&self) -> Scales {
        let all = || self.displayed.values().flatten();
        let x = LinearScale::fit_x(all(), ScaleTuning::default())
            .with_range(0.0, self.plot.width);
        let y = LinearScale::fit_y(all(), self.y_tuning).with_range(self.plot.height, 0.0);
        Scales::linear(x, y).with_origin(self.plot.left, self.plot.top)
    }

    /// Binds `data` into layer `id` with `adapter` and the scene's policy.
    pub fn bind_layer<D, F>(
        &mut self,
        id: &LayerId,
        data: &[D],
        key_fn: F,
        adapter: &dyn RenderAdapter,
        scales: &Scales,
        overrides: TransitionOverrides,
    ) -> BindResult
    where
        D: Clone + Into<Datum>,
        F: FnMut(&D) -> VizResult<EntityKey>,
    {
        let mut ctx = BindContext {
            kind: self.kind,
            policy: &self.policy,
            overrides,
            now_ms: self.surface.now_ms(),
            reporter: &mut self.diagnostics,
        };
        let mut callbacks = AdapterCallbacks::new(adapter, scales);
        bind(
            self.surface.layer_mut(id),
            Some(data),
            key_fn,
            &mut callbacks,
            &mut ctx,
        )
    }

    /// Redraws path and markers of `series` from its displayed points.
    ///
    /// Entities whose geometry fails keep their previous state; the first
    /// such failure is returned after every other entity was drawn.
    pub fn render_series(
        &mut self,
        series: &str,
        scales: &Scales,
        overrides: TransitionOverrides,
    ) -> VizResult<()> {
        let reported = self.diagnostics.errors.len();
        let points = self.displayed.get(series).cloned().unwrap_or_default();
        let path: Vec<Series> = if points.is_empty() || !self.show_path {
            Vec::new()
        } else {
            vec![Series::new(series, points.clone())]
        };
        let line = LineAdapter {
            colors: Arc::clone(&self.colors),
            stroke_width: self.stroke_width,
        };
        self.bind_layer(
            &series_layer(series),
            &path,
            |series: &Series| Ok(series.name.clone()),
            &line,
            scales,
            overrides,
        );

        let markers: Vec<SeriesPoint> = points
            .into_iter()
            .map(|point| SeriesPoint {
                series: series.to_owned(),
                point,
            })
            .collect();
        let point_adapter = PointAdapter::new(Arc::clone(&self.colors), self.point_radius);
        self.bind_layer(
            &marker_layer(series),
            &markers,
            |marker: &SeriesPoint| Ok(point_key(&marker.series, marker.point.x)),
            &point_adapter,
            scales,
            overrides,
        );

        match self.diagnostics.errors[reported..]
            .iter()
            .find(|err| matches!(err, VizError::TransitionFailure(_)))
        {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Fades out every live entity of `id`; an already empty layer is
    /// dropped from the surface.
    pub fn retire_layer(&mut self, id: &LayerId, spec: TransitionSpec) -> usize {
        let now_ms = self.surface.now_ms();
        let Some(layer) = self.surface.layer_mut_existing(id) else {
            return 0;
        };
        if layer.is_empty() {
            self.surface.remove_layer(id);
            return 0;
        }
        let mut retired = 0;
        for entity in layer.iter_mut().filter(|entity| !entity.is_exiting()) {
            entity.fade_out(spec, now_ms);
            retired += 1;
        }
        retired
    }

    /// Rebinds both axes' ticks against `scales`.
    pub fn render_axes(&mut self, scales: &Scales, spec: TransitionSpec) {
        let overrides = TransitionOverrides::uniform(spec);
        let text = TextAdapter::default();

        let x_ticks: Vec<TickDatum> = match &scales.x {
            XScale::Linear(x) => x
                .ticks(self.tick_count)
                .into_iter()
                .map(|value| TickDatum {
                    side: AxisSide::Bottom,
                    value,
                    text: format_axis_x(value),
                })
                .collect(),
            XScale::Band(band) => band
                .domain()
                .iter()
                .enumerate()
                .map(|(index, category)| TickDatum {
                    side: AxisSide::Bottom,
                    value: index as f64,
                    text: category.clone(),
                })
                .collect(),
        };
        let y_ticks: Vec<TickDatum> = scales
            .y
            .ticks(self.tick_count)
            .into_iter()
            .map(|value| TickDatum {
                side: AxisSide::Left,
                value,
                text: format_value(value),
            })
            .collect();

        let x = self.bind_layer(&axis_layer("x"), &x_ticks, tick_key, &text, scales, overrides);
        let y = self.bind_layer(&axis_layer("y"), &y_ticks, tick_key, &text, scales, overrides);
        debug!(x_ticks = x.all.len(), y_ticks = y.all.len(), "rendered axes");
    }
}

#[must_use]
pub fn series_layer(series: &str) -> LayerId {
    LayerId::new(LayerKind::Series, series)
}

#[must_use]
pub fn marker_layer(series: &str) -> LayerId {
    LayerId::new(LayerKind::Markers, series)
}

#[must_use]
pub fn axis_layer(name: &str) -> LayerId {
    LayerId::new(LayerKind::Axis, name)
}

/// Marker key: `{series}-{x}`.
#[must_use]
pub fn point_key(series: &str, x: f64) -> EntityKey {
    format!("{series}-{x}")
}

fn tick_key(tick: &TickDatum) -> VizResult<EntityKey> {
    Ok(match tick.side {
        AxisSide::Bottom => format!("x-{}", tick.text),
        AxisSide::Left => format!("y-{}", tick.value),
    })
}

/// X tick text; years stay ungrouped ("2001", not "2,001").
fn format_axis_x(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e6 {
        format!("{value:.0}")
    } else if value.abs() < 1e3 {
        format!("{value:.1}")
    } else {
        format_value(value)
    }
}
