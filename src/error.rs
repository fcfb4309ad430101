use thiserror::Error;

pub type VizResult<T> = Result<T, VizError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VizError {
    #[error("invalid viewport size: width={width}, height={height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("unexpected data shape: {0}")]
    DataShape(String),

    #[error("transition step failed: {0}")]
    TransitionFailure(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl VizError {
    /// Returns `true` for errors that must abort a render call.
    ///
    /// Everything else is recoverable: the engine reports it and keeps the
    /// surface in a consistent state.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::InvalidViewport { .. })
    }
}

/// Injected sink for recoverable errors.
///
/// Stateful operations (binding, diff animation) report through this hook and
/// keep going instead of returning early.
pub trait ErrorReporter {
    fn report(&mut self, error: VizError);
}

/// Logs every report as a `tracing` warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&mut self, error: VizError) {
        tracing::warn!(error = %error, "recovered from engine error");
    }
}

/// Keeps reported errors for later inspection.
#[derive(Debug, Default, Clone)]
pub struct CollectingReporter {
    pub errors: Vec<VizError>,
}

impl ErrorReporter for CollectingReporter {
    fn report(&mut self, error: VizError) {
        self.errors.push(error);
    }
}
