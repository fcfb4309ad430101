use std::sync::Arc;

use tracing::debug;

use crate::animation::{ChartScene, DiffAnimator, Scheduler};
use crate::core::Viewport;
use crate::error::{TracingReporter, VizResult};
use crate::render::{CyclePalette, Renderer};
use crate::transition::TransitionPolicy;

use super::validation::{validate_chart_config, validate_viewport};
use super::{ChartConfig, StoryChart};

impl<R: Renderer> StoryChart<R> {
    /// Creates a chart with the default transition table and palette.
    pub fn new(renderer: R, viewport: Viewport, config: ChartConfig) -> VizResult<Self> {
        Self::with_policy(renderer, viewport, config, TransitionPolicy::default())
    }

    /// Creates a chart whose binder resolves timings through `policy`.
    pub fn with_policy(
        renderer: R,
        viewport: Viewport,
        config: ChartConfig,
        policy: TransitionPolicy,
    ) -> VizResult<Self> {
        let viewport = validate_viewport(viewport)?;
        validate_chart_config(&config)?;

        let colors = config
            .color_source()
            .unwrap_or_else(|| Arc::new(CyclePalette::default()));
        let mut scene = ChartScene::new(policy, colors);
        scene.kind = config.kind;
        scene.point_radius = config.point_radius;

        debug!(
            kind = %config.kind,
            width = viewport.width,
            height = viewport.height,
            "created story chart"
        );
        Ok(Self {
            renderer,
            viewport,
            name: "chart".to_owned(),
            config,
            scene,
            scheduler: Scheduler::new(),
            animator: DiffAnimator::default(),
            metrics: None,
            rendered_kind: None,
            reporter: Box::new(TracingReporter),
        })
    }

    /// Renames the scheduler target prefix, e.g. to tell several charts of
    /// one page apart in logs.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
