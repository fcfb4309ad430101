use std::sync::Arc;

use crate::animation::{ChartScene, DiffAnimator, Scheduler};
use crate::binding::Surface;
use crate::core::Viewport;
use crate::error::{ErrorReporter, VizResult};
use crate::layout::LayoutMetrics;
use crate::render::{ColorSource, RenderFrame, Renderer};
use crate::transition::AdaptiveSpeed;

use super::validation::{validate_chart_config, validate_viewport};
use super::{ChartConfig, StoryChart};

impl<R: Renderer> StoryChart<R> {
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    /// Validates and stores `config` for the next `render_step`.
    pub fn set_config(&mut self, config: ChartConfig) -> VizResult<()> {
        validate_chart_config(&config)?;
        self.config = config;
        Ok(())
    }

    /// Layout of the last successful step.
    #[must_use]
    pub fn metrics(&self) -> Option<LayoutMetrics> {
        self.metrics
    }

    #[must_use]
    pub fn scene(&self) -> &ChartScene {
        &self.scene
    }

    #[must_use]
    pub fn surface(&self) -> &Surface {
        &self.scene.surface
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler<ChartScene> {
        &self.scheduler
    }

    #[must_use]
    pub fn now_ms(&self) -> f64 {
        self.scheduler.now_ms()
    }

    /// `true` while diff steps are queued or entity transitions are running.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.scheduler.pending() > 0 || self.scene.surface.has_active_transitions()
    }

    /// Frame of the current surface state, without presenting it.
    #[must_use]
    pub fn frame(&self) -> RenderFrame {
        RenderFrame::from_surface(&self.scene.surface, self.viewport)
    }

    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn set_adaptive_speed(&mut self, adaptive: Option<Arc<dyn AdaptiveSpeed>>) {
        self.scene.policy.set_adaptive_speed(adaptive);
    }

    /// Replaces the color source; takes effect on the next bind.
    pub fn set_color_source(&mut self, colors: Arc<dyn ColorSource>) {
        self.scene.colors = colors;
    }

    pub fn set_error_reporter(&mut self, reporter: Box<dyn ErrorReporter>) {
        self.reporter = reporter;
    }

    pub fn set_diff_animator(&mut self, animator: DiffAnimator) {
        self.animator = animator;
    }

    /// Stores a new screen size; the next step recomputes the layout.
    pub fn resize(&mut self, viewport: Viewport) -> VizResult<()> {
        self.viewport = validate_viewport(viewport)?;
        Ok(())
    }
}
