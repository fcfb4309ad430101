use crate::animation::{AdvanceReport, ChartScene, DiffAnimator, Scheduler};
use crate::core::{ChartKind, Dataset, Viewport};
use crate::error::{ErrorReporter, VizResult};
use crate::layout::LayoutMetrics;
use crate::render::{RenderFrame, Renderer};

use super::{ChartConfig, step_coordinator::StepCoordinator};

/// One chart target driven through the steps of a narrative.
///
/// `StoryChart` owns the retained surface, the cooperative scheduler running
/// diff animations, and the renderer that receives a frame after every step
/// and every clock advance.
pub struct StoryChart<R: Renderer> {
    pub(super) renderer: R,
    pub(super) viewport: Viewport,
    /// Prefix of the scheduler targets owned by this chart.
    pub(super) name: String,
    pub(super) config: ChartConfig,
    pub(super) scene: ChartScene,
    pub(super) scheduler: Scheduler<ChartScene>,
    pub(super) animator: DiffAnimator,
    pub(super) metrics: Option<LayoutMetrics>,
    pub(super) rendered_kind: Option<ChartKind>,
    pub(super) reporter: Box<dyn ErrorReporter>,
}

impl<R: Renderer> StoryChart<R> {
    /// Reconciles the surface with `dataset` under the current config.
    ///
    /// Configuration errors replace the chart with an error placeholder and
    /// are returned. Everything else is reported and the step completes.
    pub fn render_step(&mut self, dataset: &Dataset) -> VizResult<LayoutMetrics> {
        StepCoordinator::render_step(self, dataset)
    }

    /// Replaces the config, then renders `dataset` with it.
    pub fn show(&mut self, config: ChartConfig, dataset: &Dataset) -> VizResult<LayoutMetrics> {
        self.config = config;
        self.render_step(dataset)
    }

    /// Advances the animation clock by `dt_ms`, running due diff steps, and
    /// presents the resulting frame.
    pub fn advance(&mut self, dt_ms: f64) -> VizResult<AdvanceReport> {
        let report = self.scheduler.advance_by(dt_ms, &mut self.scene);
        StepCoordinator::drain_diagnostics(self);
        self.present()?;
        Ok(report)
    }

    /// Runs every pending step and transition to completion.
    pub fn finish_animations(&mut self) -> VizResult<AdvanceReport> {
        let mut report = self.scheduler.run_to_idle(&mut self.scene);
        // Transitions started by the last step may outlive it.
        for _ in 0..MAX_FINISH_SLICES {
            if !self.scene.surface.has_active_transitions() {
                break;
            }
            let step = self.scheduler.advance_by(FINISH_SLICE_MS, &mut self.scene);
            report.ran += step.ran;
            report.failed += step.failed;
        }
        StepCoordinator::drain_diagnostics(self);
        self.present()?;
        Ok(report)
    }

    /// Draws the current surface state into the renderer.
    pub fn present(&mut self) -> VizResult<()> {
        let frame = RenderFrame::from_surface(&self.scene.surface, self.viewport);
        self.renderer.render(&frame)
    }

    #[must_use]
    pub fn into_renderer(self) -> R {
        self.renderer
    }
}

const FINISH_SLICE_MS: f64 = 100.0;
const MAX_FINISH_SLICES: usize = 600;
