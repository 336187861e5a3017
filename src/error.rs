use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Failures surfaced by the cycle engine.
///
/// Only input validity and data sufficiency can fail; numerically degenerate cases inside a
/// sweep are clamped locally instead of being reported here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("insufficient data: need at least {required} bars, got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("no confirmed turning point for wavelength {wavelength:.2}; using an unconfirmed extremum")]
    NoConfirmedTurningPoint { wavelength: f64 },

    #[error("invalid wavelength {wavelength}: {reason}")]
    InvalidWavelength { wavelength: f64, reason: &'static str },

    #[error("invalid price series: {0}")]
    InvalidSeries(String),

    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

impl EngineError {
    pub(crate) fn insufficient(required: usize, available: usize) -> Self {
        Self::InsufficientData {
            required,
            available,
        }
    }
}
