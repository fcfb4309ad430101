//! Per-primitive draw strategies.
//!
//! Every adapter maps an entity's datum to target attributes and defines the
//! enter state it grows from. The shared `draw_entity` then applies the phase:
//! enter snaps to the initial state, update tweens to the target and exit fades
//! out with deferred removal.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::warn;

use crate::binding::{Attrs, AxisSide, BindCallbacks, Datum, EntityKey, KeyedEntity, Layer};
use crate::core::{ArcAngles, Scales, XScale};
use crate::error::{VizError, VizResult};
use crate::render::{Color, ColorSource, TextHAlign};
use crate::transition::{Phase, TransitionSpec};

/// Entities of one layer addressed by key, at one instant.
pub struct Selection<'a> {
    pub layer: &'a mut Layer,
    pub keys: &'a [EntityKey],
    pub now_ms: f64,
}

impl<'a> Selection<'a> {
    #[must_use]
    pub fn new(layer: &'a mut Layer, keys: &'a [EntityKey], now_ms: f64) -> Self {
        Self {
            layer,
            keys,
            now_ms,
        }
    }
}

pub trait RenderAdapter {
    /// Attributes the entity should end up with.
    fn target_attrs(&self, entity: &KeyedEntity, scales: &Scales) -> VizResult<Attrs>;

    /// State a new entity appears in before its first update.
    fn enter_attrs(&self, target: &Attrs, scales: &Scales) -> Attrs;

    fn draw_entity(
        &self,
        entity: &mut KeyedEntity,
        scales: &Scales,
        phase: Phase,
        spec: TransitionSpec,
        now_ms: f64,
    ) -> VizResult<()> {
        match phase {
            Phase::Enter => {
                let target = self.target_attrs(entity, scales)?;
                entity.set_attrs(self.enter_attrs(&target, scales));
            }
            Phase::Update => {
                let target = self.target_attrs(entity, scales)?;
                entity.transition_to(target, spec, now_ms);
            }
            Phase::Exit => entity.fade_out(spec, now_ms),
        }
        Ok(())
    }

    /// Applies `phase` to every selected entity.
    ///
    /// A failing entity keeps its previous state; the remaining entities are
    /// still drawn and the first failure is returned.
    fn draw(
        &self,
        selection: Selection<'_>,
        scales: &Scales,
        phase: Phase,
        spec: TransitionSpec,
    ) -> VizResult<()> {
        let mut first_error = None;
        for key in selection.keys {
            let Some(entity) = selection.layer.get_mut(key) else {
                continue;
            };
            if let Err(err) = self.draw_entity(entity, scales, phase, spec, selection.now_ms) {
                warn!(key = %key, phase = %phase, error = %err, "skipped entity draw");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Bridges an adapter into `bind` callbacks.
pub struct AdapterCallbacks<'a> {
    pub adapter: &'a dyn RenderAdapter,
    pub scales: &'a Scales,
}

impl<'a> AdapterCallbacks<'a> {
    #[must_use]
    pub fn new(adapter: &'a dyn RenderAdapter, scales: &'a Scales) -> Self {
        Self { adapter, scales }
    }
}

impl BindCallbacks for AdapterCallbacks<'_> {
    fn on_enter(
        &mut self,
        entity: &mut KeyedEntity,
        spec: TransitionSpec,
        now_ms: f64,
    ) -> VizResult<()> {
        self.adapter
            .draw_entity(entity, self.scales, Phase::Enter, spec, now_ms)
    }

    fn on_update(
        &mut self,
        entity: &mut KeyedEntity,
        spec: TransitionSpec,
        now_ms: f64,
    ) -> VizResult<()> {
        self.adapter
            .draw_entity(entity, self.scales, Phase::Update, spec, now_ms)
    }

    fn on_exit(
        &mut self,
        entity: &mut KeyedEntity,
        spec: TransitionSpec,
        now_ms: f64,
    ) -> VizResult<()> {
        self.adapter
            .draw_entity(entity, self.scales, Phase::Exit, spec, now_ms)
    }
}

fn mismatch(adapter: &str, entity: &KeyedEntity) -> VizError {
    VizError::TransitionFailure(format!(
        "{adapter} adapter cannot draw entity `{}`",
        entity.key
    ))
}

/// Geometry of one entity: scale errors and non-finite pixels both fail the
/// entity's transition.
fn finite(value: VizResult<f64>, what: &str, key: &str) -> VizResult<f64> {
    match value {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(_) => Err(VizError::TransitionFailure(format!(
            "non-finite {what} for entity `{key}`"
        ))),
        Err(err) => Err(VizError::TransitionFailure(format!(
            "cannot place {what} of entity `{key}`: {err}"
        ))),
    }
}

/// Series polyline.
pub struct LineAdapter {
    pub colors: Arc<dyn ColorSource>,
    pub stroke_width: f64,
}

impl LineAdapter {
    #[must_use]
    pub fn new(colors: Arc<dyn ColorSource>) -> Self {
        Self {
            colors,
            stroke_width: 2.0,
        }
    }
}

impl RenderAdapter for LineAdapter {
    fn target_attrs(&self, entity: &KeyedEntity, scales: &Scales) -> VizResult<Attrs> {
        let Datum::Path(series) = &entity.datum else {
            return Err(mismatch("line", entity));
        };
        let points = series
            .sorted_values()
            .iter()
            .map(|point| {
                let x = finite(scales.map_x(point.x), "x", &entity.key)?;
                let y = finite(scales.map_y(point.y), "y", &entity.key)?;
                Ok((x, y))
            })
            .collect::<VizResult<Vec<_>>>()?;
        Ok(Attrs {
            points,
            color: self.colors.color_for(&series.name),
            stroke_width: self.stroke_width,
            ..Attrs::default()
        })
    }

    fn enter_attrs(&self, target: &Attrs, _scales: &Scales) -> Attrs {
        Attrs {
            opacity: 0.0,
            ..target.clone()
        }
    }
}

/// Point markers; enter from radius 0.
pub struct PointAdapter {
    pub colors: Arc<dyn ColorSource>,
    pub radius: f64,
}

impl PointAdapter {
    #[must_use]
    pub fn new(colors: Arc<dyn ColorSource>, radius: f64) -> Self {
        Self { colors, radius }
    }
}

impl RenderAdapter for PointAdapter {
    fn target_attrs(&self, entity: &KeyedEntity, scales: &Scales) -> VizResult<Attrs> {
        let Datum::Point { series, point } = &entity.datum else {
            return Err(mismatch("point", entity));
        };
        Ok(Attrs {
            x: finite(scales.map_x(point.x), "x", &entity.key)?,
            y: finite(scales.map_y(point.y), "y", &entity.key)?,
            radius: self.radius,
            color: self.colors.color_for(series),
            ..Attrs::default()
        })
    }

    fn enter_attrs(&self, target: &Attrs, _scales: &Scales) -> Attrs {
        Attrs {
            radius: 0.0,
            opacity: 0.0,
            ..target.clone()
        }
    }

    fn draw_entity(
        &self,
        entity: &mut KeyedEntity,
        scales: &Scales,
        phase: Phase,
        spec: TransitionSpec,
        now_ms: f64,
    ) -> VizResult<()> {
        let target = match phase {
            Phase::Exit => {
                entity.fade_out(spec, now_ms);
                return Ok(());
            }
            _ => self.target_attrs(entity, scales)?,
        };
        if phase == Phase::Enter {
            entity.set_attrs(self.enter_attrs(&target, scales));
        } else {
            entity.transition_to(target, spec, now_ms);
        }
        if let Datum::Point { point, .. } = &entity.datum {
            entity.persisted.previous_value = Some(point.y);
        }
        Ok(())
    }
}

/// Vertical bars on a band (or linear) x axis; enter at height 0 on the
/// baseline.
pub struct BarAdapter {
    pub colors: Arc<dyn ColorSource>,
    /// Sub-band of this series inside each category band.
    pub slot: usize,
    pub slots: usize,
    /// Bar width when the x axis is linear.
    pub linear_width_px: f64,
}

impl BarAdapter {
    #[must_use]
    pub fn new(colors: Arc<dyn ColorSource>) -> Self {
        Self {
            colors,
            slot: 0,
            slots: 1,
            linear_width_px: 12.0,
        }
    }

    #[must_use]
    pub fn with_slot(mut self, slot: usize, slots: usize) -> Self {
        self.slots = slots.max(1);
        self.slot = slot.min(self.slots - 1);
        self
    }

    fn horizontal(&self, scales: &Scales, category: &str, key: &str) -> VizResult<(f64, f64)> {
        let (left, width) = match &scales.x {
            XScale::Band(band) => {
                let left = band.position(category).ok_or_else(|| {
                    VizError::TransitionFailure(format!(
                        "category `{category}` of entity `{key}` is not on the x axis"
                    ))
                })?;
                (scales.origin.0 + left, band.bandwidth())
            }
            XScale::Linear(_) => {
                let value: f64 = category.parse().map_err(|_| {
                    VizError::TransitionFailure(format!(
                        "category `{category}` of entity `{key}` is not numeric"
                    ))
                })?;
                let center = finite(scales.map_x(value), "x", key)?;
                (center - self.linear_width_px * 0.5, self.linear_width_px)
            }
        };
        let sub_width = width / self.slots as f64;
        Ok((left + sub_width * self.slot as f64, sub_width))
    }
}

impl RenderAdapter for BarAdapter {
    fn target_attrs(&self, entity: &KeyedEntity, scales: &Scales) -> VizResult<Attrs> {
        let Datum::Bar(bar) = &entity.datum else {
            return Err(mismatch("bar", entity));
        };
        let (x, width) = self.horizontal(scales, &bar.category, &entity.key)?;
        let baseline = scales.baseline_y();
        let value_y = finite(scales.map_y(bar.value), "value", &entity.key)?;
        Ok(Attrs {
            x,
            y: value_y.min(baseline),
            width,
            height: (value_y - baseline).abs(),
            color: self.colors.color_for(&bar.series),
            ..Attrs::default()
        })
    }

    fn enter_attrs(&self, target: &Attrs, scales: &Scales) -> Attrs {
        Attrs {
            y: scales.baseline_y(),
            height: 0.0,
            ..target.clone()
        }
    }

    fn draw_entity(
        &self,
        entity: &mut KeyedEntity,
        scales: &Scales,
        phase: Phase,
        spec: TransitionSpec,
        now_ms: f64,
    ) -> VizResult<()> {
        match phase {
            Phase::Enter => {
                let target = self.target_attrs(entity, scales)?;
                entity.set_attrs(self.enter_attrs(&target, scales));
            }
            Phase::Update => {
                let target = self.target_attrs(entity, scales)?;
                entity.transition_to(target, spec, now_ms);
                if let Datum::Bar(bar) = &entity.datum {
                    entity.persisted.previous_value = Some(bar.value);
                }
            }
            Phase::Exit => entity.fade_out(spec, now_ms),
        }
        Ok(())
    }
}

/// Pie/donut slices.
///
/// Start and end angles tween as a pair: from `{0, 0}` on enter and from the
/// persisted previous angles on update.
pub struct ArcAdapter {
    pub colors: Arc<dyn ColorSource>,
}

impl ArcAdapter {
    #[must_use]
    pub fn new(colors: Arc<dyn ColorSource>) -> Self {
        Self { colors }
    }
}

impl RenderAdapter for ArcAdapter {
    fn target_attrs(&self, entity: &KeyedEntity, scales: &Scales) -> VizResult<Attrs> {
        let Datum::Slice(slice) = &entity.datum else {
            return Err(mismatch("arc", entity));
        };
        let frame = scales.arc.ok_or_else(|| {
            VizError::TransitionFailure(format!(
                "entity `{}` needs a polar frame to draw an arc",
                entity.key
            ))
        })?;
        finite(Ok(slice.angles.start_angle), "start angle", &entity.key)?;
        finite(Ok(slice.angles.end_angle), "end angle", &entity.key)?;
        Ok(Attrs {
            x: frame.center_x,
            y: frame.center_y,
            radius: frame.outer_radius,
            inner_radius: frame.inner_radius,
            angles: slice.angles,
            color: self.colors.color_for(&slice.label),
            ..Attrs::default()
        })
    }

    fn enter_attrs(&self, target: &Attrs, _scales: &Scales) -> Attrs {
        Attrs {
            angles: ArcAngles::COLLAPSED,
            ..target.clone()
        }
    }

    fn draw_entity(
        &self,
        entity: &mut KeyedEntity,
        scales: &Scales,
        phase: Phase,
        spec: TransitionSpec,
        now_ms: f64,
    ) -> VizResult<()> {
        match phase {
            Phase::Enter => {
                let target = self.target_attrs(entity, scales)?;
                entity.set_attrs(self.enter_attrs(&target, scales));
                entity.persisted.previous_angles = Some(ArcAngles::COLLAPSED);
            }
            Phase::Update => {
                let target = self.target_attrs(entity, scales)?;
                // An interrupted tween continues from where it is on screen.
                let start_angles = if entity.transition().is_some() {
                    entity.attrs.angles
                } else {
                    entity
                        .persisted
                        .previous_angles
                        .unwrap_or(ArcAngles::COLLAPSED)
                };
                let from = Attrs {
                    angles: start_angles,
                    ..entity.attrs.clone()
                };
                entity.persisted.previous_angles = Some(target.angles);
                entity.transition_between(from, target, spec, now_ms);
            }
            Phase::Exit => entity.fade_out(spec, now_ms),
        }
        Ok(())
    }
}

/// Axis ticks and free labels.
pub struct TextAdapter {
    pub color: Color,
    pub tick_length_px: f64,
}

impl Default for TextAdapter {
    fn default() -> Self {
        Self {
            color: Color::rgb(0.2, 0.2, 0.2),
            tick_length_px: 6.0,
        }
    }
}

impl TextAdapter {
    fn tick_x(scales: &Scales, value: f64, text: &str) -> VizResult<f64> {
        match &scales.x {
            XScale::Linear(_) => scales.map_x(value),
            XScale::Band(band) => band
                .position(text)
                .map(|left| scales.origin.0 + left + band.bandwidth() * 0.5)
                .ok_or_else(|| {
                    VizError::TransitionFailure(format!("tick `{text}` is not on the band axis"))
                }),
        }
    }
}

impl RenderAdapter for TextAdapter {
    fn target_attrs(&self, entity: &KeyedEntity, scales: &Scales) -> VizResult<Attrs> {
        match &entity.datum {
            Datum::Tick(tick) => {
                let (range_start, range_end) = scales.y.range();
                let plot_bottom = scales.origin.1 + range_start.max(range_end);
                let mut points: SmallVec<[(f64, f64); 2]> = SmallVec::new();
                let (x, y, h_align) = match tick.side {
                    AxisSide::Bottom => {
                        let x = finite(
                            Self::tick_x(scales, tick.value, &tick.text),
                            "tick",
                            &entity.key,
                        )?;
                        points.push((x, plot_bottom));
                        points.push((x, plot_bottom + self.tick_length_px));
                        (x, plot_bottom + self.tick_length_px + 12.0, TextHAlign::Center)
                    }
                    AxisSide::Left => {
                        let y = finite(scales.map_y(tick.value), "tick", &entity.key)?;
                        let axis_x = scales.origin.0;
                        points.push((axis_x - self.tick_length_px, y));
                        points.push((axis_x, y));
                        (axis_x - self.tick_length_px - 3.0, y + 4.0, TextHAlign::Right)
                    }
                };
                Ok(Attrs {
                    x,
                    y,
                    points: points.into_vec(),
                    color: self.color,
                    stroke_width: 1.0,
                    text: Some(tick.text.clone()),
                    font_size_px: 11.0,
                    h_align,
                    ..Attrs::default()
                })
            }
            Datum::Label(label) => Ok(Attrs {
                x: finite(Ok(label.x), "x", &entity.key)?,
                y: finite(Ok(label.y), "y", &entity.key)?,
                color: self.color,
                text: Some(label.text.clone()),
                font_size_px: label.font_size_px,
                h_align: label.h_align,
                ..Attrs::default()
            }),
            _ => Err(mismatch("text", entity)),
        }
    }

    fn enter_attrs(&self, target: &Attrs, _scales: &Scales) -> Attrs {
        Attrs {
            opacity: 0.0,
            ..target.clone()
        }
    }
}

/// Grid cells; enter collapsed at the cell center.
pub struct CellAdapter {
    pub colors: Arc<dyn ColorSource>,
}

impl CellAdapter {
    #[must_use]
    pub fn new(colors: Arc<dyn ColorSource>) -> Self {
        Self { colors }
    }
}

impl RenderAdapter for CellAdapter {
    fn target_attrs(&self, entity: &KeyedEntity, _scales: &Scales) -> VizResult<Attrs> {
        let Datum::Cell(cell) = &entity.datum else {
            return Err(mismatch("cell", entity));
        };
        Ok(Attrs {
            x: cell.cell.x,
            y: cell.cell.y,
            width: cell.cell.width,
            height: cell.cell.height,
            color: self.colors.color_for(&cell.group),
            ..Attrs::default()
        })
    }

    fn enter_attrs(&self, target: &Attrs, _scales: &Scales) -> Attrs {
        Attrs {
            x: target.x + target.width * 0.5,
            y: target.y + target.height * 0.5,
            width: 0.0,
            height: 0.0,
            ..target.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BarDatum, SeriesPoint};
    use crate::core::{ArcFrame, BandScale, DataPoint, Easing, LinearScale, PieSlice};
    use crate::render::CyclePalette;

    fn palette() -> Arc<dyn ColorSource> {
        Arc::new(CyclePalette::default())
    }

    fn linear_scales() -> Scales {
        Scales::linear(
            LinearScale::new(0.0, 10.0).expect("x").with_range(0.0, 100.0),
            LinearScale::new(0.0, 10.0).expect("y").with_range(100.0, 0.0),
        )
    }

    #[test]
    fn points_enter_from_radius_zero() {
        let adapter = PointAdapter::new(palette(), 4.0);
        let scales = linear_scales();
        let mut entity = KeyedEntity::new(
            "s-1",
            SeriesPoint {
                series: "s".to_owned(),
                point: DataPoint::new(1.0, 5.0),
            }
            .into(),
        );
        let spec = TransitionSpec::new(100.0, Easing::Linear);
        adapter
            .draw_entity(&mut entity, &scales, Phase::Enter, spec, 0.0)
            .expect("enter");
        assert_eq!(entity.attrs.radius, 0.0);
        adapter
            .draw_entity(&mut entity, &scales, Phase::Update, spec, 0.0)
            .expect("update");
        entity.advance(100.0);
        assert_eq!(entity.attrs.radius, 4.0);
        assert_eq!(entity.persisted.previous_value, Some(5.0));
    }

    #[test]
    fn bars_enter_at_baseline_with_zero_height() {
        let adapter = BarAdapter::new(palette());
        let band = BandScale::new(vec!["a".to_owned(), "b".to_owned()], 0.0, 100.0);
        let scales = Scales {
            x: XScale::Band(band),
            ..linear_scales()
        };
        let mut entity = KeyedEntity::new(
            "a",
            BarDatum {
                category: "a".to_owned(),
                series: "s".to_owned(),
                value: 5.0,
            }
            .into(),
        );
        adapter
            .draw_entity(&mut entity, &scales, Phase::Enter, TransitionSpec::INSTANT, 0.0)
            .expect("enter");
        assert_eq!(entity.attrs.height, 0.0);
        assert_eq!(entity.attrs.y, scales.baseline_y());

        let target = adapter.target_attrs(&entity, &scales).expect("target");
        assert_eq!(target.height, 50.0);
        assert_eq!(target.y, 50.0);
    }

    #[test]
    fn arcs_tween_from_persisted_angles() {
        let adapter = ArcAdapter::new(palette());
        let scales = linear_scales().with_arc(ArcFrame {
            center_x: 50.0,
            center_y: 50.0,
            inner_radius: 0.0,
            outer_radius: 40.0,
        });
        let slice = |end: f64| {
            Datum::Slice(PieSlice {
                label: "a".to_owned(),
                value: 1.0,
                angles: ArcAngles::new(0.0, end),
            })
        };
        let spec = TransitionSpec::new(100.0, Easing::Linear);
        let mut entity = KeyedEntity::new("a", slice(2.0));
        adapter
            .draw_entity(&mut entity, &scales, Phase::Enter, spec, 0.0)
            .expect("enter");
        assert_eq!(entity.attrs.angles, ArcAngles::COLLAPSED);
        adapter
            .draw_entity(&mut entity, &scales, Phase::Update, spec, 0.0)
            .expect("update");
        entity.advance(100.0);
        assert_eq!(entity.persisted.previous_angles, Some(ArcAngles::new(0.0, 2.0)));

        entity.datum = slice(1.0);
        adapter
            .draw_entity(&mut entity, &scales, Phase::Update, spec, 100.0)
            .expect("update");
        entity.advance(150.0);
        assert!((entity.attrs.angles.end_angle - 1.5).abs() <= 1e-9);
    }

    #[test]
    fn mismatched_datum_is_a_transition_failure() {
        let adapter = CellAdapter::new(palette());
        let entity = KeyedEntity::new("x", Datum::Path(crate::core::Series::new("s", Vec::new())));
        assert!(matches!(
            adapter.target_attrs(&entity, &linear_scales()),
            Err(VizError::TransitionFailure(_))
        ));
    }

    #[test]
    fn draw_over_selection_skips_failing_entities() {
        let adapter = PointAdapter::new(palette(), 4.0);
        let scales = linear_scales();
        let mut layer = Layer::new();
        for (key, y) in [("s-1", 2.0), ("s-2", f64::NAN), ("s-3", 8.0)] {
            let point = SeriesPoint {
                series: "s".to_owned(),
                point: DataPoint::new(1.0, y),
            };
            layer.insert(KeyedEntity::new(key, point.into()));
        }
        let keys: Vec<EntityKey> = ["s-1", "s-2", "s-3", "gone"]
            .into_iter()
            .map(str::to_owned)
            .collect();
        let spec = TransitionSpec::new(200.0, Easing::Linear);

        let result = adapter.draw(
            Selection::new(&mut layer, &keys, 0.0),
            &scales,
            Phase::Update,
            spec,
        );
        assert!(matches!(result, Err(VizError::TransitionFailure(_))));
        assert!(layer.get("s-1").expect("s-1").transition().is_some());
        assert!(layer.get("s-2").expect("s-2").transition().is_none());
        let last = layer.get("s-3").expect("s-3");
        assert!((last.target_attrs().y - 20.0).abs() <= 1e-9);

        let first = Selection::new(&mut layer, &keys[..1], 0.0);
        adapter.draw(first, &scales, Phase::Exit, spec).expect("exit");
        assert!(layer.get("s-1").expect("s-1").is_exiting());
    }
}
