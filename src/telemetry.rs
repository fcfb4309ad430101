//! Tracing hooks of the engine.
//!
//! The engine only emits events and spans (`storyviz::binding`,
//! `storyviz::animation`, ...). Hosts install their own subscriber or, with
//! the `telemetry` feature, call [`init_default_tracing`].

use tracing::Span;

use crate::core::ChartKind;

/// Filter used when `RUST_LOG` is unset: engine warnings only.
pub const DEFAULT_FILTER: &str = "storyviz=warn";

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`, falling back
/// to [`DEFAULT_FILTER`].
///
/// Returns `false` when the feature is disabled or the host already set a
/// global subscriber.
#[must_use]
pub fn init_default_tracing() -> bool {
    init_tracing_with_filter(DEFAULT_FILTER)
}

/// Same as [`init_default_tracing`] with a caller fallback filter, e.g.
/// `"storyviz::animation=trace"` to follow individual diff steps.
#[must_use]
pub fn init_tracing_with_filter(fallback: &str) -> bool {
    #[cfg(feature = "telemetry")]
    {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));
        return tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init()
            .is_ok();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        let _ = fallback;
        false
    }
}

/// Span wrapping one narrative step of chart `chart`.
#[must_use]
pub fn step_span(chart: &str, kind: ChartKind, rows: usize) -> Span {
    tracing::debug_span!("render_step", chart, kind = %kind, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "telemetry"))]
    #[test]
    fn init_is_a_no_op_without_the_feature() {
        assert!(!init_default_tracing());
        assert!(!init_tracing_with_filter("storyviz=trace"));
    }

    #[test]
    fn step_span_can_be_entered_without_a_subscriber() {
        let span = step_span("chart", ChartKind::Bar, 3);
        let _guard = span.enter();
    }
}
