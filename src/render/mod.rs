pub mod adapters;
mod color;
mod frame;
mod null_renderer;
mod primitives;

pub use adapters::{
    AdapterCallbacks, ArcAdapter, BarAdapter, CellAdapter, LineAdapter, PointAdapter,
    RenderAdapter, Selection, TextAdapter,
};
pub use color::{ColorSource, CyclePalette, SolidColor};
pub use frame::{Primitive, RenderFrame, entity_primitives};
pub use null_renderer::NullRenderer;
pub use primitives::{
    ArcPrimitive, CirclePrimitive, Color, LinePrimitive, PathPrimitive, RectPrimitive,
    TextHAlign, TextPrimitive,
};

use crate::error::VizResult;

/// Contract implemented by any rendering backend.
///
/// Backends receive a fully materialized `RenderFrame` so drawing code stays
/// isolated from binding and animation logic.
pub trait Renderer {
    fn render(&mut self, frame: &RenderFrame) -> VizResult<()>;
}
