use std::collections::HashSet;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use crate::animation::{TargetId, axis_layer, marker_layer, series_layer};
use crate::binding::{BarDatum, CellDatum, EntityKey, LabelDatum, LayerId, LayerKind};
use crate::core::{
    ArcFrame, BandScale, ChartKind, DataShapeWarning, Dataset, LinearScale, PieSlice, Row,
    ScaleTuning, Scales, Series, XScale, group_series, numeric_field, pie_layout,
};
use crate::error::{VizError, VizResult};
use crate::layout::{
    GridCell, LayoutConfig, LayoutMetrics, compute_grid_cells, compute_legend, compute_margins,
};
use crate::render::{ArcAdapter, BarAdapter, CellAdapter, Renderer, TextAdapter, TextHAlign};
use crate::telemetry::step_span;
use crate::transition::{Phase, TransitionOverrides};

use super::StoryChart;
use super::validation::validate_chart_config;

const TITLE_FONT_PX: f64 = 18.0;
const SUBTITLE_FONT_PX: f64 = 13.0;
const LEGEND_FONT_PX: f64 = 12.0;
const PLACEHOLDER_FONT_PX: f64 = 14.0;

#[must_use]
pub fn bar_layer(series: &str) -> LayerId {
    LayerId::new(LayerKind::Series, format!("bar/{series}"))
}

#[must_use]
pub fn pie_layer() -> LayerId {
    LayerId::new(LayerKind::Series, "pie")
}

#[must_use]
pub fn grid_layer() -> LayerId {
    LayerId::new(LayerKind::Series, "grid")
}

#[must_use]
pub fn legend_swatch_layer() -> LayerId {
    LayerId::new(LayerKind::Legend, "swatches")
}

#[must_use]
pub fn legend_label_layer() -> LayerId {
    LayerId::new(LayerKind::Legend, "labels")
}

#[must_use]
pub fn title_layer() -> LayerId {
    LayerId::new(LayerKind::Labels, "titles")
}

#[must_use]
pub fn placeholder_layer() -> LayerId {
    LayerId::new(LayerKind::Overlay, "placeholder")
}

/// Scheduler target of one line series of chart `chart`.
#[must_use]
pub fn series_target(chart: &str, series: &str) -> TargetId {
    TargetId::new(format!("{chart}/{series}"))
}

/// Runs one narrative step: layout, per-kind binding, legend, titles and
/// retirement of whatever the step no longer draws.
pub(super) struct StepCoordinator;

impl StepCoordinator {
    pub(super) fn render_step<R: Renderer>(
        chart: &mut StoryChart<R>,
        dataset: &Dataset,
    ) -> VizResult<LayoutMetrics> {
        let span = step_span(&chart.name, chart.config.kind, dataset.len());
        let _entered = span.enter();
        if let Err(err) = validate_chart_config(&chart.config) {
            Self::fail_step(chart, err.clone());
            return Err(err);
        }

        let layout = chart.config.layout_config();
        let kind = layout.kind;
        let metrics = compute_margins(dataset, &layout, chart.viewport);
        debug!(
            kind = %kind,
            rows = dataset.len(),
            left = metrics.left,
            top = metrics.top,
            inner_width = metrics.inner_width,
            inner_height = metrics.inner_height,
            "computed step layout"
        );

        if let Some(colors) = chart.config.color_source() {
            chart.scene.colors = colors;
        }
        chart.scene.kind = kind;
        chart.scene.plot = metrics.into();
        chart.scene.point_radius = chart.config.point_radius;
        chart.scene.show_path = kind != ChartKind::Scatter;

        if chart.rendered_kind.is_some_and(|previous| previous != kind) {
            Self::reset_line_state(chart);
        }
        chart.rendered_kind = Some(kind);

        let mut touched = HashSet::new();
        if dataset.is_empty() {
            Self::reset_line_state(chart);
            Self::bind_placeholder(chart, "No data", &mut touched);
        } else {
            let names = match kind {
                ChartKind::Line | ChartKind::Area | ChartKind::Scatter => {
                    Self::render_lines(chart, dataset, &mut touched)
                }
                ChartKind::Bar => Self::render_bars(chart, dataset, &mut touched),
                ChartKind::Pie => Self::render_pie(chart, dataset, &mut touched),
                ChartKind::Grid => match Self::render_grid(chart, dataset, metrics, &mut touched) {
                    Ok(names) => names,
                    Err(err) => {
                        Self::fail_step(chart, err.clone());
                        return Err(err);
                    }
                },
            };
            Self::render_legend(chart, &names, metrics, &layout, &mut touched);
        }
        Self::render_titles(chart, &layout, &mut touched);
        Self::retire_untouched(chart, &touched);

        chart.metrics = Some(metrics);
        Self::drain_diagnostics(chart);
        chart.present()?;
        Ok(metrics)
    }

    /// Forwards errors collected by the scene to the chart's reporter.
    pub(super) fn drain_diagnostics<R: Renderer>(chart: &mut StoryChart<R>) {
        for err in std::mem::take(&mut chart.scene.diagnostics.errors) {
            chart.reporter.report(err);
        }
    }

    fn fail_step<R: Renderer>(chart: &mut StoryChart<R>, err: VizError) {
        warn!(error = %err, "render step aborted");
        Self::reset_line_state(chart);
        let mut touched = HashSet::new();
        Self::bind_placeholder(chart, &format!("Chart unavailable: {err}"), &mut touched);
        Self::retire_untouched(chart, &touched);
        Self::drain_diagnostics(chart);
        if let Err(render_err) = chart.present() {
            warn!(error = %render_err, "failed to present error placeholder");
        }
    }

    /// Cancels running diffs and forgets every displayed line series.
    fn reset_line_state<R: Renderer>(chart: &mut StoryChart<R>) {
        let names: Vec<String> = chart.scene.displayed_names().cloned().collect();
        for name in names {
            chart
                .scheduler
                .cancel_target(&series_target(&chart.name, &name));
            chart.scene.clear_displayed(&name);
        }
    }

    fn render_lines<R: Renderer>(
        chart: &mut StoryChart<R>,
        dataset: &Dataset,
        touched: &mut HashSet<LayerId>,
    ) -> Vec<String> {
        let config = chart.config.clone();
        let kind = config.kind;
        let grouped = group_series(dataset, &config.fields);
        Self::report_warnings(chart, &grouped.warnings);
        let names: Vec<String> = grouped.series.iter().map(|s| s.name.clone()).collect();

        let stale: Vec<String> = chart
            .scene
            .displayed_names()
            .filter(|name| !names.contains(*name))
            .cloned()
            .collect();
        for name in stale {
            chart
                .scheduler
                .cancel_target(&series_target(&chart.name, &name));
            chart.scene.clear_displayed(&name);
        }

        touched.insert(axis_layer("x"));
        touched.insert(axis_layer("y"));
        for name in &names {
            touched.insert(series_layer(name));
            touched.insert(marker_layer(name));
        }

        let smooth = config.smooth_update && matches!(kind, ChartKind::Line | ChartKind::Area);
        if smooth {
            let duration = chart
                .scene
                .policy
                .adapt(kind, Phase::Update, config.diff_duration_ms);
            for series in &grouped.series {
                let target = series_target(&chart.name, &series.name);
                let shown = chart
                    .scene
                    .displayed(&series.name)
                    .map(<[_]>::to_vec)
                    .unwrap_or_default();
                let old = Series::new(series.name.clone(), shown);
                let handle = chart.animator.animate_diff(
                    &mut chart.scheduler,
                    &mut chart.scene,
                    &target,
                    &old,
                    series,
                    duration,
                );
                debug!(
                    target = %target,
                    steps = handle.diff.len(),
                    entered = handle.entered,
                    "started smooth series update"
                );
            }
            return names;
        }

        for series in &grouped.series {
            chart
                .scheduler
                .cancel_target(&series_target(&chart.name, &series.name));
            chart.scene.set_displayed(&series.name, series.values.clone());
        }
        let scales = chart.scene.line_scales();
        let axis_spec = chart
            .scene
            .policy
            .resolve(kind, Phase::Update, config.transitions.update.as_ref());
        chart.scene.render_axes(&scales, axis_spec);
        for series in &grouped.series {
            // Failures are already in the scene diagnostics.
            if let Err(err) = chart
                .scene
                .render_series(&series.name, &scales, config.transitions)
            {
                debug!(series = %series.name, error = %err, "series drawn partially");
            }
        }
        names
    }

    fn render_bars<R: Renderer>(
        chart: &mut StoryChart<R>,
        dataset: &Dataset,
        touched: &mut HashSet<LayerId>,
    ) -> Vec<String> {
        let config = chart.config.clone();
        let fields = &config.fields;
        let mut categories: IndexSet<String> = IndexSet::new();
        let mut by_series: IndexMap<String, Vec<BarDatum>> = IndexMap::new();

        for (index, row) in dataset.iter().enumerate() {
            let Some(category) = category_label(row, &fields.x) else {
                Self::report_missing_label(chart, index, &fields.x);
                continue;
            };
            let (value, warning) = numeric_field(row, index, &fields.y, fields.fallback_value);
            if let Some(warning) = warning {
                Self::report_warnings(chart, &[warning]);
            }
            let series = fields.series_name(row);
            categories.insert(category.clone());
            by_series.entry(series.clone()).or_default().push(BarDatum {
                category,
                series,
                value,
            });
        }

        let (min, max) = by_series
            .values()
            .flatten()
            .map(|bar| bar.value)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        let plot = chart.scene.plot;
        let y = LinearScale::from_extent(
            min,
            max,
            ScaleTuning {
                include_zero: true,
                ..chart.scene.y_tuning
            },
        )
        .with_range(plot.height, 0.0);
        let band = BandScale::new(categories.into_iter().collect(), 0.0, plot.width);
        let scales = Scales {
            x: XScale::Band(band),
            y,
            arc: None,
            origin: (plot.left, plot.top),
        };

        let axis_spec = chart.scene.policy.resolve(
            config.kind,
            Phase::Update,
            config.transitions.update.as_ref(),
        );
        chart.scene.render_axes(&scales, axis_spec);
        touched.insert(axis_layer("x"));
        touched.insert(axis_layer("y"));

        let slots = by_series.len();
        for (slot, (series, bars)) in by_series.iter().enumerate() {
            let adapter = BarAdapter::new(Arc::clone(&chart.scene.colors)).with_slot(slot, slots);
            let id = bar_layer(series);
            chart.scene.bind_layer(
                &id,
                bars,
                |bar: &BarDatum| Ok(bar.category.clone()),
                &adapter,
                &scales,
                config.transitions,
            );
            touched.insert(id);
        }
        by_series.into_keys().collect()
    }

    fn render_pie<R: Renderer>(
        chart: &mut StoryChart<R>,
        dataset: &Dataset,
        touched: &mut HashSet<LayerId>,
    ) -> Vec<String> {
        let config = chart.config.clone();
        let fields = &config.fields;
        let mut totals: IndexMap<String, f64> = IndexMap::new();
        for (index, row) in dataset.iter().enumerate() {
            let Some(label) = category_label(row, &fields.x) else {
                Self::report_missing_label(chart, index, &fields.x);
                continue;
            };
            let (value, warning) = numeric_field(row, index, &fields.y, fields.fallback_value);
            if let Some(warning) = warning {
                Self::report_warnings(chart, &[warning]);
            }
            *totals.entry(label).or_insert(0.0) += value;
        }

        let values: Vec<(String, f64)> = totals.into_iter().collect();
        let slices = pie_layout(&values);
        let plot = chart.scene.plot;
        let frame = ArcFrame {
            center_x: plot.left + plot.width * 0.5,
            center_y: plot.top + plot.height * 0.5,
            inner_radius: 0.0,
            outer_radius: (plot.width.min(plot.height) * 0.5).max(0.0),
        };
        let scales = placeholder_scales(chart).with_arc(frame);
        let adapter = ArcAdapter::new(Arc::clone(&chart.scene.colors));
        let id = pie_layer();
        chart.scene.bind_layer(
            &id,
            &slices,
            |slice: &PieSlice| Ok(slice.label.clone()),
            &adapter,
            &scales,
            config.transitions,
        );
        touched.insert(id);
        values.into_iter().map(|(label, _)| label).collect()
    }

    fn render_grid<R: Renderer>(
        chart: &mut StoryChart<R>,
        dataset: &Dataset,
        metrics: LayoutMetrics,
        touched: &mut HashSet<LayerId>,
    ) -> VizResult<Vec<String>> {
        let config = chart.config.clone();
        let fields = &config.fields;
        let grid = config.grid.unwrap_or_default();
        let cells = compute_grid_cells(&grid, metrics)?;

        let mut data = Vec::with_capacity(dataset.len().min(cells.len()));
        let mut groups: IndexSet<String> = IndexSet::new();
        for (index, row) in dataset.iter().enumerate() {
            let Some(cell) = cells.get(index) else {
                break;
            };
            let (value, warning) = numeric_field(row, index, &fields.y, fields.fallback_value);
            if let Some(warning) = warning {
                Self::report_warnings(chart, &[warning]);
            }
            let group = fields.series_name(row);
            groups.insert(group.clone());
            data.push(CellDatum {
                label: category_label(row, &fields.x).unwrap_or_else(|| index.to_string()),
                group,
                value,
                cell: *cell,
            });
        }
        if dataset.len() > cells.len() {
            chart.reporter.report(VizError::DataShape(format!(
                "{} rows do not fit the {} grid cells and were not drawn",
                dataset.len() - cells.len(),
                cells.len()
            )));
        }

        let scales = placeholder_scales(chart);
        let adapter = CellAdapter::new(Arc::clone(&chart.scene.colors));
        let id = grid_layer();
        chart.scene.bind_layer(
            &id,
            &data,
            |cell: &CellDatum| Ok(cell_key(cell)),
            &adapter,
            &scales,
            config.transitions,
        );
        touched.insert(id);
        Ok(groups.into_iter().collect())
    }

    fn render_legend<R: Renderer>(
        chart: &mut StoryChart<R>,
        names: &[String],
        metrics: LayoutMetrics,
        layout: &LayoutConfig,
        touched: &mut HashSet<LayerId>,
    ) {
        let Some(legend) = compute_legend(names, metrics, layout) else {
            return;
        };
        let swatches: Vec<CellDatum> = legend
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| CellDatum {
                label: item.name.clone(),
                group: item.name.clone(),
                value: 0.0,
                cell: GridCell {
                    column: 0,
                    row: u32::try_from(index).unwrap_or(u32::MAX),
                    x: item.swatch_x,
                    y: item.swatch_y,
                    width: legend.swatch_size,
                    height: legend.swatch_size,
                },
            })
            .collect();
        let labels: Vec<LabelDatum> = legend
            .items
            .iter()
            .map(|item| LabelDatum {
                text: item.name.clone(),
                x: item.label_x,
                y: item.label_y + LEGEND_FONT_PX * 0.35,
                font_size_px: LEGEND_FONT_PX,
                h_align: TextHAlign::Left,
            })
            .collect();

        let scales = placeholder_scales(chart);
        let overrides = chart.config.transitions;
        let swatch_adapter = CellAdapter::new(Arc::clone(&chart.scene.colors));
        chart.scene.bind_layer(
            &legend_swatch_layer(),
            &swatches,
            |swatch: &CellDatum| Ok(swatch.label.clone()),
            &swatch_adapter,
            &scales,
            overrides,
        );
        chart.scene.bind_layer(
            &legend_label_layer(),
            &labels,
            |label: &LabelDatum| Ok(label.text.clone()),
            &TextAdapter::default(),
            &scales,
            overrides,
        );
        touched.insert(legend_swatch_layer());
        touched.insert(legend_label_layer());
    }

    fn render_titles<R: Renderer>(
        chart: &mut StoryChart<R>,
        layout: &LayoutConfig,
        touched: &mut HashSet<LayerId>,
    ) {
        let center_x = f64::from(chart.viewport.width) * 0.5;
        let mut labels = Vec::new();
        let mut baseline = 0.0;
        if let Some(title) = layout.title.as_deref().filter(|t| !t.is_empty()) {
            baseline += TITLE_FONT_PX + 8.0;
            labels.push(title_datum(title, center_x, baseline, TITLE_FONT_PX));
        }
        if let Some(subtitle) = layout.subtitle.as_deref().filter(|t| !t.is_empty()) {
            baseline += SUBTITLE_FONT_PX + 8.0;
            labels.push(title_datum(subtitle, center_x, baseline, SUBTITLE_FONT_PX));
        }
        if labels.is_empty() && chart.scene.surface.layer(&title_layer()).is_none() {
            return;
        }

        // Keyed by text: a new title fades in while the previous one fades out.
        let scales = placeholder_scales(chart);
        chart.scene.bind_layer(
            &title_layer(),
            &labels,
            |label: &LabelDatum| Ok(label.text.clone()),
            &TextAdapter::default(),
            &scales,
            chart.config.transitions,
        );
        touched.insert(title_layer());
    }

    fn bind_placeholder<R: Renderer>(
        chart: &mut StoryChart<R>,
        text: &str,
        touched: &mut HashSet<LayerId>,
    ) {
        let label = LabelDatum {
            text: text.to_owned(),
            x: f64::from(chart.viewport.width) * 0.5,
            y: f64::from(chart.viewport.height) * 0.5,
            font_size_px: PLACEHOLDER_FONT_PX,
            h_align: TextHAlign::Center,
        };
        let scales = placeholder_scales(chart);
        chart.scene.bind_layer(
            &placeholder_layer(),
            &[label],
            |_: &LabelDatum| Ok("placeholder".to_owned()),
            &TextAdapter::default(),
            &scales,
            TransitionOverrides::default(),
        );
        touched.insert(placeholder_layer());
    }

    fn retire_untouched<R: Renderer>(chart: &mut StoryChart<R>, touched: &HashSet<LayerId>) {
        let exit = chart.scene.policy.resolve(
            chart.scene.kind,
            Phase::Exit,
            chart.config.transitions.exit.as_ref(),
        );
        let stale: Vec<LayerId> = chart
            .scene
            .surface
            .layer_ids()
            .filter(|id| !touched.contains(*id))
            .cloned()
            .collect();
        for id in stale {
            let retired = chart.scene.retire_layer(&id, exit);
            if retired > 0 {
                debug!(layer = %id.name, retired, "retired layer");
            }
        }
    }

    fn report_warnings<R: Renderer>(chart: &mut StoryChart<R>, warnings: &[DataShapeWarning]) {
        for warning in warnings {
            chart.reporter.report(VizError::DataShape(format!(
                "row {}, field `{}`: {}",
                warning.row_index, warning.field, warning.message
            )));
        }
    }

    fn report_missing_label<R: Renderer>(chart: &mut StoryChart<R>, row_index: usize, field: &str) {
        chart.reporter.report(VizError::DataShape(format!(
            "row {row_index}, field `{field}`: label is missing; row skipped"
        )));
    }
}

/// Text of a categorical field; `None` when missing or blank.
fn category_label(row: &Row, field: &str) -> Option<String> {
    row.get(field)
        .filter(|value| !value.is_missing())
        .map(ToString::to_string)
        .filter(|text| !text.trim().is_empty())
}

fn cell_key(cell: &CellDatum) -> EntityKey {
    format!("{}/{}", cell.group, cell.label)
}

fn title_datum(text: &str, x: f64, y: f64, font_size_px: f64) -> LabelDatum {
    LabelDatum {
        text: text.to_owned(),
        x,
        y,
        font_size_px,
        h_align: TextHAlign::Center,
    }
}

/// Identity scales over the plot; for adapters that place entities in
/// surface pixels.
fn placeholder_scales<R: Renderer>(chart: &StoryChart<R>) -> Scales {
    let plot = chart.scene.plot;
    let unit = LinearScale::from_extent(0.0, 1.0, ScaleTuning::default());
    Scales::linear(
        unit.with_range(0.0, plot.width),
        unit.with_range(plot.height, 0.0),
    )
    .with_origin(plot.left, plot.top)
}
