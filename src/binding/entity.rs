use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{ArcAngles, DataPoint, PieSlice, Row, Series, lerp};
use crate::layout::GridCell;
use crate::render::{Color, TextHAlign};
use crate::transition::TransitionSpec;

/// Stable identity of a visual entity inside one layer.
pub type EntityKey = String;

/// Which axis a tick belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisSide {
    Bottom,
    Left,
}

/// Bar value of one category.
#[derive(Debug, Clone, PartialEq)]
pub struct BarDatum {
    pub category: String,
    pub series: String,
    pub value: f64,
}

/// Grid cell bound to one dataset row (or one legend swatch).
#[derive(Debug, Clone, PartialEq)]
pub struct CellDatum {
    pub label: String,
    /// Color group, usually the series name.
    pub group: String,
    pub value: f64,
    pub cell: GridCell,
}

/// Axis tick bound to its domain value.
#[derive(Debug, Clone, PartialEq)]
pub struct TickDatum {
    pub side: AxisSide,
    pub value: f64,
    pub text: String,
}

/// Free text placed in surface pixels (titles, legend entries, placeholders).
#[derive(Debug, Clone, PartialEq)]
pub struct LabelDatum {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size_px: f64,
    pub h_align: TextHAlign,
}

/// Data bound to an entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Row(Arc<Row>),
    Point { series: String, point: DataPoint },
    Path(Series),
    Bar(BarDatum),
    Slice(PieSlice),
    Cell(CellDatum),
    Tick(TickDatum),
    Label(LabelDatum),
}

impl From<Arc<Row>> for Datum {
    fn from(row: Arc<Row>) -> Self {
        Self::Row(row)
    }
}

impl From<Series> for Datum {
    fn from(series: Series) -> Self {
        Self::Path(series)
    }
}

impl From<BarDatum> for Datum {
    fn from(bar: BarDatum) -> Self {
        Self::Bar(bar)
    }
}

impl From<PieSlice> for Datum {
    fn from(slice: PieSlice) -> Self {
        Self::Slice(slice)
    }
}

impl From<CellDatum> for Datum {
    fn from(cell: CellDatum) -> Self {
        Self::Cell(cell)
    }
}

impl From<TickDatum> for Datum {
    fn from(tick: TickDatum) -> Self {
        Self::Tick(tick)
    }
}

impl From<LabelDatum> for Datum {
    fn from(label: LabelDatum) -> Self {
        Self::Label(label)
    }
}

/// Marker datum carrying its series name.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub series: String,
    pub point: DataPoint,
}

impl From<SeriesPoint> for Datum {
    fn from(value: SeriesPoint) -> Self {
        Self::Point {
            series: value.series,
            point: value.point,
        }
    }
}

/// Drawable attributes of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Attrs {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub radius: f64,
    pub inner_radius: f64,
    pub opacity: f64,
    pub angles: ArcAngles,
    pub points: Vec<(f64, f64)>,
    pub color: Color,
    pub stroke_width: f64,
    pub text: Option<String>,
    pub font_size_px: f64,
    pub h_align: TextHAlign,
}

impl Default for Attrs {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            radius: 0.0,
            inner_radius: 0.0,
            opacity: 1.0,
            angles: ArcAngles::COLLAPSED,
            points: Vec::new(),
            color: Color::default(),
            stroke_width: 2.0,
            text: None,
            font_size_px: 12.0,
            h_align: TextHAlign::Left,
        }
    }
}

impl Attrs {
    /// Blends `self` towards `to` at eased progress `t`.
    ///
    /// Paths with different vertex counts cannot be morphed; they switch to
    /// the target geometry as soon as the transition starts. Text switches at
    /// the same moment.
    #[must_use]
    pub fn interpolate(&self, to: &Self, t: f64) -> Self {
        let points = if self.points.len() == to.points.len() {
            self.points
                .iter()
                .zip(&to.points)
                .map(|(a, b)| (lerp(a.0, b.0, t), lerp(a.1, b.1, t)))
                .collect()
        } else if t > 0.0 {
            to.points.clone()
        } else {
            self.points.clone()
        };

        Self {
            x: lerp(self.x, to.x, t),
            y: lerp(self.y, to.y, t),
            width: lerp(self.width, to.width, t),
            height: lerp(self.height, to.height, t),
            radius: lerp(self.radius, to.radius, t),
            inner_radius: lerp(self.inner_radius, to.inner_radius, t),
            opacity: lerp(self.opacity, to.opacity, t),
            angles: self.angles.interpolate(to.angles, t),
            points,
            color: self.color.interpolate(to.color, t),
            stroke_width: lerp(self.stroke_width, to.stroke_width, t),
            text: if t > 0.0 {
                to.text.clone()
            } else {
                self.text.clone()
            },
            font_size_px: lerp(self.font_size_px, to.font_size_px, t),
            h_align: to.h_align,
        }
    }
}

/// The one piece of element-local memory adapters may keep.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PersistedState {
    /// Arc angles the entity was last sent to.
    pub previous_angles: Option<ArcAngles>,
    /// Value the entity was last drawn for.
    pub previous_value: Option<f64>,
}

/// In-flight tween owned by the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityTransition {
    pub from: Attrs,
    pub to: Attrs,
    pub spec: TransitionSpec,
    pub started_at_ms: f64,
    /// Remove the entity once the tween completes (exit fade).
    pub remove_on_end: bool,
}

impl EntityTransition {
    #[must_use]
    pub fn is_complete(&self, now_ms: f64) -> bool {
        now_ms - self.started_at_ms >= self.spec.duration_ms
    }
}

/// Visual element bound to a stable key.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedEntity {
    pub key: EntityKey,
    pub datum: Datum,
    pub attrs: Attrs,
    pub persisted: PersistedState,
    transition: Option<EntityTransition>,
}

impl KeyedEntity {
    #[must_use]
    pub fn new(key: impl Into<EntityKey>, datum: Datum) -> Self {
        Self {
            key: key.into(),
            datum,
            attrs: Attrs::default(),
            persisted: PersistedState::default(),
            transition: None,
        }
    }

    #[must_use]
    pub fn transition(&self) -> Option<&EntityTransition> {
        self.transition.as_ref()
    }

    /// `true` while an exit fade is pending removal.
    #[must_use]
    pub fn is_exiting(&self) -> bool {
        self.transition.as_ref().is_some_and(|t| t.remove_on_end)
    }

    /// Final attributes: the transition target if one is running.
    #[must_use]
    pub fn target_attrs(&self) -> &Attrs {
        self.transition.as_ref().map_or(&self.attrs, |t| &t.to)
    }

    /// Snaps to `attrs`, dropping any running transition.
    pub fn set_attrs(&mut self, attrs: Attrs) {
        self.attrs = attrs;
        self.transition = None;
    }

    /// Tweens from the current attributes to `to`.
    ///
    /// Zero-length specs apply immediately. Starting a transition on an
    /// exiting entity revives it.
    pub fn transition_to(&mut self, to: Attrs, spec: TransitionSpec, now_ms: f64) {
        let from = self.attrs.clone();
        self.transition_between(from, to, spec, now_ms);
    }

    /// Tweens from an explicit start state, e.g. a persisted arc angle.
    pub fn transition_between(
        &mut self,
        from: Attrs,
        to: Attrs,
        spec: TransitionSpec,
        now_ms: f64,
    ) {
        if spec.duration_ms <= 0.0 {
            self.set_attrs(to);
            return;
        }
        self.attrs = from.clone();
        self.transition = Some(EntityTransition {
            from,
            to,
            spec,
            started_at_ms: now_ms,
            remove_on_end: false,
        });
    }

    /// Fades to zero opacity; the surface removes the entity when the fade
    /// completes, never before.
    pub fn fade_out(&mut self, spec: TransitionSpec, now_ms: f64) {
        if self.is_exiting() {
            return;
        }
        let from = self.attrs.clone();
        let to = Attrs {
            opacity: 0.0,
            ..self.target_attrs().clone()
        };
        self.transition = Some(EntityTransition {
            from,
            to,
            spec: TransitionSpec {
                duration_ms: spec.duration_ms.max(0.0),
                easing: spec.easing,
            },
            started_at_ms: now_ms,
            remove_on_end: true,
        });
    }

    /// Stops a pending exit fade where it currently is.
    pub fn cancel_exit(&mut self) {
        if self.is_exiting() {
            self.transition = None;
        }
    }

    /// Advances the running transition; returns `true` when the entity should
    /// be removed from its layer.
    pub fn advance(&mut self, now_ms: f64) -> bool {
        let Some(transition) = &self.transition else {
            return false;
        };
        if transition.is_complete(now_ms) {
            let remove = transition.remove_on_end;
            self.attrs = transition.to.clone();
            self.transition = None;
            return remove;
        }
        let t = transition
            .spec
            .progress((now_ms - transition.started_at_ms).max(0.0));
        self.attrs = transition.from.interpolate(&transition.to, t);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Easing;

    fn label(text: &str) -> Datum {
        Datum::Label(LabelDatum {
            text: text.to_owned(),
            x: 0.0,
            y: 0.0,
            font_size_px: 12.0,
            h_align: TextHAlign::Left,
        })
    }

    #[test]
    fn fade_out_defers_removal_until_completion() {
        let mut entity = KeyedEntity::new("a", label("a"));
        entity.fade_out(TransitionSpec::new(100.0, Easing::Linear), 0.0);

        assert!(entity.is_exiting());
        assert!(!entity.advance(50.0));
        assert!((entity.attrs.opacity - 0.5).abs() <= 1e-9);
        assert!(entity.advance(100.0));
    }

    #[test]
    fn zero_length_fade_still_waits_for_a_tick() {
        let mut entity = KeyedEntity::new("a", label("a"));
        entity.fade_out(TransitionSpec::INSTANT, 10.0);
        assert!(entity.is_exiting());
        assert!(entity.advance(10.0));
    }

    #[test]
    fn transition_revives_exiting_entity() {
        let mut entity = KeyedEntity::new("a", label("a"));
        entity.fade_out(TransitionSpec::new(100.0, Easing::Linear), 0.0);
        entity.advance(40.0);
        entity.transition_to(
            Attrs::default(),
            TransitionSpec::new(100.0, Easing::Linear),
            40.0,
        );
        assert!(!entity.is_exiting());
        assert!(!entity.advance(200.0));
        assert_eq!(entity.attrs.opacity, 1.0);
    }
}
