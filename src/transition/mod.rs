//! Duration/easing resolution per chart kind and reconciliation phase.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::{ChartKind, Easing};

/// Reconciliation phase of a keyed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Enter,
    Update,
    Exit,
}

impl Phase {
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "enter" => Some(Self::Enter),
            "update" => Some(Self::Update),
            "exit" => Some(Self::Exit),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Enter => "enter",
            Self::Update => "update",
            Self::Exit => "exit",
        })
    }
}

/// Resolved timing for one phase of one render.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub duration_ms: f64,
    pub easing: Easing,
}

impl TransitionSpec {
    pub const FALLBACK: Self = Self {
        duration_ms: 600.0,
        easing: Easing::CubicInOut,
    };

    pub const INSTANT: Self = Self {
        duration_ms: 0.0,
        easing: Easing::Linear,
    };

    #[must_use]
    pub const fn new(duration_ms: f64, easing: Easing) -> Self {
        Self {
            duration_ms,
            easing,
        }
    }

    /// Eased progress at `elapsed_ms`; zero-length specs are complete at once.
    #[must_use]
    pub fn progress(self, elapsed_ms: f64) -> f64 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        self.easing.apply(elapsed_ms / self.duration_ms)
    }
}

/// Optional caller override for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PhaseOverride {
    #[serde(default)]
    pub duration_ms: Option<f64>,
    #[serde(default)]
    pub easing: Option<Easing>,
}

impl PhaseOverride {
    #[must_use]
    pub fn duration(duration_ms: f64) -> Self {
        Self {
            duration_ms: Some(duration_ms),
            easing: None,
        }
    }

    #[must_use]
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = Some(easing);
        self
    }
}

/// Per-phase overrides carried by a chart configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TransitionOverrides {
    #[serde(default)]
    pub enter: Option<PhaseOverride>,
    #[serde(default)]
    pub update: Option<PhaseOverride>,
    #[serde(default)]
    pub exit: Option<PhaseOverride>,
}

impl TransitionOverrides {
    /// Same timing for all three phases.
    #[must_use]
    pub fn uniform(spec: TransitionSpec) -> Self {
        let phase = PhaseOverride {
            duration_ms: Some(spec.duration_ms),
            easing: Some(spec.easing),
        };
        Self {
            enter: Some(phase),
            update: Some(phase),
            exit: Some(phase),
        }
    }

    #[must_use]
    pub fn for_phase(&self, phase: Phase) -> Option<&PhaseOverride> {
        match phase {
            Phase::Enter => self.enter.as_ref(),
            Phase::Update => self.update.as_ref(),
            Phase::Exit => self.exit.as_ref(),
        }
    }
}

/// Host capability that may shorten table durations, e.g. for reduced motion
/// or low-power devices.
pub trait AdaptiveSpeed: Send + Sync {
    fn adjust(&self, kind: ChartKind, phase: Phase, duration_ms: f64) -> f64;
}

/// Disables animation entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReducedMotion;

impl AdaptiveSpeed for ReducedMotion {
    fn adjust(&self, _kind: ChartKind, _phase: Phase, _duration_ms: f64) -> f64 {
        0.0
    }
}

/// Multiplies every table duration by a constant factor.
#[derive(Debug, Clone, Copy)]
pub struct SpeedFactor(pub f64);

impl AdaptiveSpeed for SpeedFactor {
    fn adjust(&self, _kind: ChartKind, _phase: Phase, duration_ms: f64) -> f64 {
        duration_ms * self.0
    }
}

/// Picks a `TransitionSpec` for every (chart kind, phase) pair.
///
/// Precedence: explicit override, then the adaptive-speed hook applied to the
/// table default, then the line/update default, then `TransitionSpec::FALLBACK`.
#[derive(Clone)]
pub struct TransitionPolicy {
    table: IndexMap<(ChartKind, Phase), TransitionSpec>,
    adaptive: Option<Arc<dyn AdaptiveSpeed>>,
}

impl fmt::Debug for TransitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionPolicy")
            .field("table", &self.table)
            .field("adaptive", &self.adaptive.is_some())
            .finish()
    }
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        use ChartKind::{Bar, Grid, Line, Pie};
        use Phase::{Enter, Exit, Update};

        let table = [
            ((Line, Enter), TransitionSpec::new(800.0, Easing::CubicOut)),
            ((Line, Update), TransitionSpec::new(750.0, Easing::CubicInOut)),
            ((Line, Exit), TransitionSpec::new(400.0, Easing::CubicIn)),
            ((Bar, Enter), TransitionSpec::new(600.0, Easing::CubicOut)),
            ((Bar, Update), TransitionSpec::new(600.0, Easing::CubicInOut)),
            ((Bar, Exit), TransitionSpec::new(300.0, Easing::QuadIn)),
            ((Pie, Enter), TransitionSpec::new(900.0, Easing::CubicOut)),
            ((Pie, Update), TransitionSpec::new(750.0, Easing::CubicInOut)),
            ((Pie, Exit), TransitionSpec::new(400.0, Easing::QuadIn)),
            ((Grid, Enter), TransitionSpec::new(500.0, Easing::QuadOut)),
            ((Grid, Update), TransitionSpec::new(500.0, Easing::QuadInOut)),
            ((Grid, Exit), TransitionSpec::new(300.0, Easing::QuadIn)),
        ]
        .into_iter()
        .collect();

        Self {
            table,
            adaptive: None,
        }
    }
}

impl TransitionPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy without defaults; every lookup resolves to the fallback spec.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            table: IndexMap::new(),
            adaptive: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, kind: ChartKind, phase: Phase, spec: TransitionSpec) -> Self {
        self.table.insert((kind, phase), spec);
        self
    }

    #[must_use]
    pub fn with_adaptive_speed(mut self, adaptive: Arc<dyn AdaptiveSpeed>) -> Self {
        self.adaptive = Some(adaptive);
        self
    }

    pub fn set_adaptive_speed(&mut self, adaptive: Option<Arc<dyn AdaptiveSpeed>>) {
        self.adaptive = adaptive;
    }

    /// Resolves timing for `phase` of a `kind` chart. Never fails.
    #[must_use]
    pub fn resolve(
        &self,
        kind: ChartKind,
        phase: Phase,
        overrides: Option<&PhaseOverride>,
    ) -> TransitionSpec {
        let base = self.table_default(kind, phase);

        let override_duration = overrides
            .and_then(|o| o.duration_ms)
            .and_then(|duration| sanitize_duration(duration, kind, phase));
        let easing = overrides.and_then(|o| o.easing).unwrap_or(base.easing);

        let duration_ms = match override_duration {
            Some(duration) => duration,
            None => self.adapt(kind, phase, base.duration_ms),
        };

        TransitionSpec {
            duration_ms,
            easing,
        }
    }

    /// String-keyed variant for declarative configs.
    ///
    /// Unknown names fall back to the line/update default with a warning.
    #[must_use]
    pub fn resolve_named(
        &self,
        kind: &str,
        phase: &str,
        overrides: Option<&PhaseOverride>,
    ) -> TransitionSpec {
        match (ChartKind::parse(kind), Phase::parse(phase)) {
            (Some(kind), Some(phase)) => self.resolve(kind, phase, overrides),
            _ => {
                warn!(kind, phase, "unknown transition lookup; using line/update default");
                self.resolve(ChartKind::Line, Phase::Update, overrides)
            }
        }
    }

    fn table_default(&self, kind: ChartKind, phase: Phase) -> TransitionSpec {
        if let Some(spec) = self.table.get(&(kind, phase)) {
            return *spec;
        }
        warn!(%kind, %phase, "no transition default; using line/update default");
        self.table
            .get(&(ChartKind::Line, Phase::Update))
            .copied()
            .unwrap_or(TransitionSpec::FALLBACK)
    }

    /// Runs `duration_ms` through the adaptive-speed hook, if any. The result
    /// is never longer than the input.
    #[must_use]
    pub fn adapt(&self, kind: ChartKind, phase: Phase, duration_ms: f64) -> f64 {
        if !duration_ms.is_finite() || duration_ms <= 0.0 {
            return 0.0;
        }
        let Some(adaptive) = &self.adaptive else {
            return duration_ms;
        };
        let adjusted = adaptive.adjust(kind, phase, duration_ms);
        if adjusted.is_finite() {
            adjusted.clamp(0.0, duration_ms)
        } else {
            warn!(%kind, %phase, "adaptive speed returned a non-finite duration; ignoring");
            duration_ms
        }
    }
}

fn sanitize_duration(duration_ms: f64, kind: ChartKind, phase: Phase) -> Option<f64> {
    if duration_ms.is_finite() && duration_ms >= 0.0 {
        Some(duration_ms)
    } else {
        warn!(%kind, %phase, duration_ms, "ignoring invalid transition duration override");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_override_beats_adaptive_hook() {
        let policy = TransitionPolicy::default().with_adaptive_speed(Arc::new(ReducedMotion));
        let spec = policy.resolve(
            ChartKind::Bar,
            Phase::Update,
            Some(&PhaseOverride::duration(1200.0)),
        );
        assert_eq!(spec.duration_ms, 1200.0);
        assert_eq!(spec.easing, Easing::CubicInOut);
    }

    #[test]
    fn adaptive_hook_shrinks_table_defaults_only() {
        let policy = TransitionPolicy::default().with_adaptive_speed(Arc::new(SpeedFactor(0.5)));
        let spec = policy.resolve(ChartKind::Pie, Phase::Enter, None);
        assert_eq!(spec.duration_ms, 450.0);
    }

    #[test]
    fn adaptive_hook_cannot_lengthen_durations() {
        let policy = TransitionPolicy::default().with_adaptive_speed(Arc::new(SpeedFactor(3.0)));
        let spec = policy.resolve(ChartKind::Line, Phase::Update, None);
        assert_eq!(spec.duration_ms, 750.0);
    }

    #[test]
    fn missing_entries_fall_back_to_line_update_then_hard_default() {
        let policy = TransitionPolicy::default();
        assert_eq!(
            policy.resolve(ChartKind::Scatter, Phase::Enter, None),
            policy.resolve(ChartKind::Line, Phase::Update, None)
        );

        let empty = TransitionPolicy::empty();
        assert_eq!(
            empty.resolve(ChartKind::Bar, Phase::Exit, None),
            TransitionSpec::FALLBACK
        );
    }

    #[test]
    fn unknown_names_resolve_to_line_update() {
        let policy = TransitionPolicy::default();
        let spec = policy.resolve_named("map", "wobble", None);
        assert_eq!(spec, TransitionSpec::new(750.0, Easing::CubicInOut));
    }

    #[test]
    fn invalid_override_durations_are_ignored() {
        let policy = TransitionPolicy::default();
        let spec = policy.resolve(
            ChartKind::Bar,
            Phase::Exit,
            Some(&PhaseOverride::duration(f64::NAN).with_easing(Easing::Linear)),
        );
        assert_eq!(spec, TransitionSpec::new(300.0, Easing::Linear));
    }
}
