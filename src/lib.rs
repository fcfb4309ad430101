//! storyviz: incremental update engine for scroll-driven narrative charts.
//!
//! Each narrative step hands the engine a dataset and a declarative chart
//! config. The engine computes the layout, reconciles keyed visual entities
//! against the ones already on screen and animates the difference: enter,
//! update and exit transitions per entity, or a point-by-point morph for
//! ordered line series.

pub mod animation;
pub mod api;
pub mod binding;
pub mod core;
pub mod error;
pub mod layout;
pub mod render;
pub mod telemetry;
pub mod transition;

pub use api::{ChartConfig, StepDefinition, StoryChart};
pub use error::{VizError, VizResult};
