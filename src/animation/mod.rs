//! Cooperative scheduling and diff-based series animation.

mod diff;
mod scene;
mod scheduler;

pub use diff::{AXIS_RESCALE, DiffAnimator, DiffHandle, DiffStep, SeriesDiff, diff_series};
pub use scene::{ChartScene, PlotArea, axis_layer, marker_layer, point_key, series_layer};
pub use scheduler::{AdvanceReport, Scheduler, TargetId, Tick, TimerHandle};
