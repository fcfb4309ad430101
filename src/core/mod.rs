pub mod dataset;
pub mod easing;
pub mod pie;
pub mod primitives;
pub mod scale;
pub mod types;

pub use dataset::{DataShapeWarning, FieldMapping, GroupedSeries, group_series, numeric_field};
pub use easing::{Easing, lerp};
pub use pie::{ArcAngles, PieSlice, pie_layout};
pub use primitives::coerce_number;
pub use scale::{ArcFrame, BandScale, LinearScale, ScaleTuning, Scales, XScale};
pub use types::{ChartKind, DataPoint, Dataset, FieldValue, Row, Series, Viewport, row};
