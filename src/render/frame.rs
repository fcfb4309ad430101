use smallvec::SmallVec;

use crate::binding::{Attrs, Datum, KeyedEntity, LayerId, Surface};
use crate::core::Viewport;
use crate::error::{VizError, VizResult};
use crate::render::{
    ArcPrimitive, CirclePrimitive, Color, LinePrimitive, PathPrimitive, RectPrimitive,
    TextPrimitive,
};

/// One draw command produced from an entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Line(LinePrimitive),
    Path(PathPrimitive),
    Rect(RectPrimitive),
    Circle(CirclePrimitive),
    Arc(ArcPrimitive),
    Text(TextPrimitive),
}

/// Backend-agnostic scene for one draw pass.
///
/// Primitives are stored per kind in surface paint order; backends draw the
/// vectors in field order (lines, paths, rects, circles, arcs, texts).
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub viewport: Viewport,
    pub lines: Vec<LinePrimitive>,
    pub paths: Vec<PathPrimitive>,
    pub rects: Vec<RectPrimitive>,
    pub circles: Vec<CirclePrimitive>,
    pub arcs: Vec<ArcPrimitive>,
    pub texts: Vec<TextPrimitive>,
}

impl RenderFrame {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            lines: Vec::new(),
            paths: Vec::new(),
            rects: Vec::new(),
            circles: Vec::new(),
            arcs: Vec::new(),
            texts: Vec::new(),
        }
    }

    /// Snapshot of the surface's current (mid-transition) attributes.
    ///
    /// Fully transparent entities are skipped.
    #[must_use]
    pub fn from_surface(surface: &Surface, viewport: Viewport) -> Self {
        let mut frame = Self::new(viewport);
        for (_, layer) in surface.layers() {
            for entity in layer.iter() {
                for primitive in entity_primitives(entity) {
                    frame.push(primitive);
                }
            }
        }
        frame
    }

    /// Snapshot of a single layer.
    #[must_use]
    pub fn from_layer(surface: &Surface, id: &LayerId, viewport: Viewport) -> Self {
        let mut frame = Self::new(viewport);
        if let Some(layer) = surface.layer(id) {
            for entity in layer.iter() {
                for primitive in entity_primitives(entity) {
                    frame.push(primitive);
                }
            }
        }
        frame
    }

    pub fn push(&mut self, primitive: Primitive) {
        match primitive {
            Primitive::Line(line) => self.lines.push(line),
            Primitive::Path(path) => self.paths.push(path),
            Primitive::Rect(rect) => self.rects.push(rect),
            Primitive::Circle(circle) => self.circles.push(circle),
            Primitive::Arc(arc) => self.arcs.push(arc),
            Primitive::Text(text) => self.texts.push(text),
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: TextPrimitive) -> Self {
        self.texts.push(text);
        self
    }

    #[must_use]
    pub fn with_rect(mut self, rect: RectPrimitive) -> Self {
        self.rects.push(rect);
        self
    }

    pub fn validate(&self) -> VizResult<()> {
        if !self.viewport.is_valid() {
            return Err(VizError::InvalidViewport {
                width: self.viewport.width,
                height: self.viewport.height,
            });
        }

        for line in &self.lines {
            line.validate()?;
        }
        for path in &self.paths {
            path.validate()?;
        }
        for rect in &self.rects {
            rect.validate()?;
        }
        for circle in &self.circles {
            circle.validate()?;
        }
        for arc in &self.arcs {
            arc.validate()?;
        }
        for text in &self.texts {
            text.validate()?;
        }

        Ok(())
    }

    #[must_use]
    pub fn primitive_count(&self) -> usize {
        self.lines.len()
            + self.paths.len()
            + self.rects.len()
            + self.circles.len()
            + self.arcs.len()
            + self.texts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primitive_count() == 0
    }
}

/// Projects one entity into draw commands. Opacity folds into color alpha.
#[must_use]
pub fn entity_primitives(entity: &KeyedEntity) -> SmallVec<[Primitive; 2]> {
    let attrs = &entity.attrs;
    let mut out = SmallVec::new();
    let opacity = attrs.opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return out;
    }
    let color = attrs
        .color
        .with_alpha((attrs.color.alpha * opacity).clamp(0.0, 1.0));

    match &entity.datum {
        Datum::Bar(_) | Datum::Cell(_) => {
            out.push(Primitive::Rect(rect_of(attrs, color)));
        }
        Datum::Point { .. } => {
            out.push(Primitive::Circle(CirclePrimitive {
                cx: attrs.x,
                cy: attrs.y,
                radius: attrs.radius.max(0.0),
                fill: color,
            }));
        }
        Datum::Slice(_) => {
            out.push(Primitive::Arc(ArcPrimitive {
                cx: attrs.x,
                cy: attrs.y,
                inner_radius: attrs.inner_radius.max(0.0),
                outer_radius: attrs.radius.max(attrs.inner_radius.max(0.0)),
                angles: attrs.angles,
                fill: color,
            }));
        }
        Datum::Path(_) | Datum::Tick(_) | Datum::Label(_) => {
            push_strokes_and_text(&mut out, attrs, color);
        }
        Datum::Row(_) => {
            if attrs.width > 0.0 && attrs.height > 0.0 {
                out.push(Primitive::Rect(rect_of(attrs, color)));
            } else if attrs.radius > 0.0 {
                out.push(Primitive::Circle(CirclePrimitive {
                    cx: attrs.x,
                    cy: attrs.y,
                    radius: attrs.radius,
                    fill: color,
                }));
            }
            push_strokes_and_text(&mut out, attrs, color);
        }
    }
    out
}

fn rect_of(attrs: &Attrs, fill: Color) -> RectPrimitive {
    RectPrimitive::new(
        attrs.x,
        attrs.y,
        attrs.width.max(0.0),
        attrs.height.max(0.0),
        fill,
    )
}

fn push_strokes_and_text(
    out: &mut SmallVec<[Primitive; 2]>,
    attrs: &Attrs,
    color: Color,
) {
    match attrs.points.len() {
        0 | 1 => {}
        2 => out.push(Primitive::Line(LinePrimitive::new(
            attrs.points[0].0,
            attrs.points[0].1,
            attrs.points[1].0,
            attrs.points[1].1,
            attrs.stroke_width,
            color,
        ))),
        _ => out.push(Primitive::Path(PathPrimitive {
            points: attrs.points.clone(),
            stroke_width: attrs.stroke_width,
            color,
        })),
    }
    if let Some(text) = attrs.text.as_deref().filter(|text| !text.is_empty()) {
        out.push(Primitive::Text(TextPrimitive::new(
            text,
            attrs.x,
            attrs.y,
            attrs.font_size_px,
            color,
            attrs.h_align,
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BarDatum, LayerKind};

    #[test]
    fn opacity_multiplies_alpha_and_zero_opacity_is_skipped() {
        let mut surface = Surface::new();
        let layer = surface.layer_mut(&LayerId::new(LayerKind::Series, "bars"));
        let datum = Datum::Bar(BarDatum {
            category: "a".to_owned(),
            series: "s".to_owned(),
            value: 1.0,
        });
        let mut visible = KeyedEntity::new("a", datum.clone());
        visible.set_attrs(Attrs {
            width: 10.0,
            height: 20.0,
            opacity: 0.5,
            color: Color::rgb(1.0, 0.0, 0.0),
            ..Attrs::default()
        });
        let mut hidden = KeyedEntity::new("b", datum);
        hidden.set_attrs(Attrs {
            opacity: 0.0,
            ..Attrs::default()
        });
        layer.insert(visible);
        layer.insert(hidden);

        let frame = RenderFrame::from_surface(&surface, Viewport::new(100, 100));
        assert_eq!(frame.rects.len(), 1);
        assert!((frame.rects[0].fill.alpha - 0.5).abs() <= 1e-12);
        assert!(frame.validate().is_ok());
    }

    #[test]
    fn invalid_viewport_fails_validation() {
        let frame = RenderFrame::new(Viewport::new(0, 10));
        assert!(matches!(
            frame.validate(),
            Err(VizError::InvalidViewport { .. })
        ));
    }
}
