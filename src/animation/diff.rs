//! Point-level animation between two versions of an ordered series.
//!
//! Instead of cross-fading a whole line, the animator removes and adds the
//! individual points that changed, one at a time, rescaling the axes after
//! every step.

use std::collections::BTreeSet;

use ordered_float::OrderedFloat;
use tracing::{debug, trace};

use crate::animation::scene::ChartScene;
use crate::animation::scheduler::{Scheduler, TargetId, TimerHandle};
use crate::core::{DataPoint, Easing, Series};
use crate::error::VizResult;
use crate::transition::{TransitionOverrides, TransitionSpec};

/// Secondary transition used when axes rescale between diff steps.
pub const AXIS_RESCALE: TransitionSpec = TransitionSpec::new(200.0, Easing::CubicInOut);

/// Points to remove and add between two versions of a series.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeriesDiff {
    /// Old points whose x is gone, largest x first.
    pub to_remove: Vec<DataPoint>,
    /// New points whose x is new, smallest x first.
    pub to_add: Vec<DataPoint>,
}

impl SeriesDiff {
    #[must_use]
    pub fn len(&self) -> usize {
        self.to_remove.len() + self.to_add.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removal steps followed by addition steps, in execution order.
    #[must_use]
    pub fn steps(&self) -> Vec<DiffStep> {
        self.to_remove
            .iter()
            .map(|point| DiffStep::Remove(point.x))
            .chain(self.to_add.iter().cloned().map(DiffStep::Add))
            .collect()
    }
}

/// One mutation of the displayed point list.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffStep {
    Remove(f64),
    Add(DataPoint),
}

/// Keyed difference by x value. When one x appears several times in a
/// series, its first occurrence is the one that counts.
#[must_use]
pub fn diff_series(old: &[DataPoint], new: &[DataPoint]) -> SeriesDiff {
    let old_keys: BTreeSet<OrderedFloat<f64>> = old.iter().map(|p| OrderedFloat(p.x)).collect();
    let new_keys: BTreeSet<OrderedFloat<f64>> = new.iter().map(|p| OrderedFloat(p.x)).collect();

    let mut to_remove = first_occurrences(old, |x| !new_keys.contains(&x));
    let mut to_add = first_occurrences(new, |x| !old_keys.contains(&x));
    to_remove.sort_by(|a, b| b.x.total_cmp(&a.x));
    to_add.sort_by(|a, b| a.x.total_cmp(&b.x));
    SeriesDiff { to_remove, to_add }
}

fn first_occurrences(
    points: &[DataPoint],
    mut keep: impl FnMut(OrderedFloat<f64>) -> bool,
) -> Vec<DataPoint> {
    let mut seen = BTreeSet::new();
    points
        .iter()
        .filter(|point| {
            let key = OrderedFloat(point.x);
            seen.insert(key) && keep(key)
        })
        .cloned()
        .collect()
}

/// Timers of one `animate_diff` call.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffHandle {
    pub target: TargetId,
    pub timers: Vec<TimerHandle>,
    pub diff: SeriesDiff,
    /// `true` when the call drew the new series directly (empty old series).
    pub entered: bool,
}

impl DiffHandle {
    /// Cancels every timer of the handle's target.
    pub fn cancel(&self, scheduler: &mut Scheduler<ChartScene>) -> usize {
        scheduler.cancel_target(&self.target)
    }

    #[must_use]
    pub fn is_active(&self, scheduler: &Scheduler<ChartScene>) -> bool {
        self.timers.iter().any(|timer| scheduler.is_pending(timer))
    }
}

/// Staggered point-by-point line animator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffAnimator {
    pub axis_spec: TransitionSpec,
    pub step_easing: Easing,
}

impl Default for DiffAnimator {
    fn default() -> Self {
        Self {
            axis_spec: AXIS_RESCALE,
            step_easing: Easing::CubicOut,
        }
    }
}

impl DiffAnimator {
    /// Schedules the morph of `old` into `new` on `target`.
    ///
    /// Pending timers of `target` are cancelled first, so at most one diff
    /// sequence is ever live per target. An empty `old` series skips diffing
    /// and draws `new` at once with the enter transition. Every sequence ends
    /// with a step at `total_duration_ms` that sets the displayed points to
    /// exactly `new.values`.
    pub fn animate_diff(
        &self,
        scheduler: &mut Scheduler<ChartScene>,
        scene: &mut ChartScene,
        target: &TargetId,
        old: &Series,
        new: &Series,
        total_duration_ms: f64,
    ) -> DiffHandle {
        let cancelled = scheduler.cancel_target(target);
        if cancelled > 0 {
            debug!(target = %target, cancelled, "pre-empted running diff");
        }

        if old.is_empty() {
            self.enter_directly(scene, new);
            return DiffHandle {
                target: target.clone(),
                timers: Vec::new(),
                diff: SeriesDiff::default(),
                entered: true,
            };
        }

        let total = if total_duration_ms.is_finite() {
            total_duration_ms.max(0.0)
        } else {
            0.0
        };
        let diff = diff_series(&old.values, &new.values);
        let steps = diff.steps();
        let interval = if steps.is_empty() {
            0.0
        } else {
            total / steps.len() as f64
        };
        let step_spec = TransitionSpec::new(interval, self.step_easing);
        let axis_spec = self.axis_spec;

        let mut timers = Vec::with_capacity(steps.len() + 1);
        for (index, step) in steps.into_iter().enumerate() {
            let series = new.name.clone();
            timers.push(scheduler.schedule(
                target,
                index as f64 * interval,
                move |scene: &mut ChartScene| {
                    apply_step(scene, &series, step, step_spec, axis_spec)
                },
            ));
        }

        let series = new.name.clone();
        let final_values = new.values.clone();
        timers.push(scheduler.schedule(target, total, move |scene: &mut ChartScene| {
            scene.set_displayed(&series, final_values);
            redraw(scene, &series, step_spec, axis_spec)
        }));

        debug!(
            target = %target,
            series = %new.name,
            remove = diff.to_remove.len(),
            add = diff.to_add.len(),
            interval_ms = interval,
            "scheduled diff animation"
        );
        DiffHandle {
            target: target.clone(),
            timers,
            diff,
            entered: false,
        }
    }

    fn enter_directly(&self, scene: &mut ChartScene, new: &Series) {
        scene.set_displayed(&new.name, new.values.clone());
        let scales = scene.line_scales();
        // Every entity is new, so the binder plays the enter timing.
        let overrides = TransitionOverrides::default();
        if let Err(err) = scene.render_series(&new.name, &scales, overrides) {
            debug!(series = %new.name, error = %err, "enter render skipped entities");
        }
        scene.render_axes(&scales, self.axis_spec);
        // Series already on screen move with the rescaled axes.
        let others: Vec<String> = scene
            .displayed_names()
            .filter(|name| **name != new.name)
            .cloned()
            .collect();
        for other in others {
            let overrides = TransitionOverrides::uniform(self.axis_spec);
            if let Err(err) = scene.render_series(&other, &scales, overrides) {
                debug!(series = %other, error = %err, "rescale render skipped entities");
            }
        }
    }
}

fn apply_step(
    scene: &mut ChartScene,
    series: &str,
    step: DiffStep,
    step_spec: TransitionSpec,
    axis_spec: TransitionSpec,
) -> VizResult<()> {
    match step {
        DiffStep::Remove(x) => {
            let removed = scene.remove_point(series, x);
            trace!(series, x, removed, "diff step: remove");
        }
        DiffStep::Add(point) => {
            let x = point.x;
            let added = scene.insert_point(series, point);
            trace!(series, x, added, "diff step: add");
        }
    }
    redraw(scene, series, step_spec, axis_spec)
}

fn redraw(
    scene: &mut ChartScene,
    series: &str,
    step_spec: TransitionSpec,
    axis_spec: TransitionSpec,
) -> VizResult<()> {
    let scales = scene.line_scales();
    scene.render_axes(&scales, axis_spec);
    let mut result = scene.render_series(series, &scales, TransitionOverrides::uniform(step_spec));
    // Other series share the rescaled axes.
    let others: Vec<String> = scene
        .displayed_names()
        .filter(|name| name.as_str() != series)
        .cloned()
        .collect();
    for other in others {
        let overrides = TransitionOverrides::uniform(step_spec);
        let outcome = scene.render_series(&other, &scales, overrides);
        if result.is_ok() {
            result = outcome;
        }
    }
    result
}
