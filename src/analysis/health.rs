use serde::Serialize;

use crate::analysis::stats::{coefficient_of_variation, mean_or_zero};
use crate::analysis::swings::{same_kind_spacings, swing_amplitudes, SwingPoint};

/// The recent regime spans this many wavelengths at the end of the component.
pub const HEALTH_LOOKBACK_CYCLES: f64 = 3.0;
const MIN_SWINGS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    Healthy,
    Degrading,
    Unstable,
    Insufficient,
}

/// Whether a cycle is holding its shape in the most recent stretch of data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CycleHealth {
    pub score: f64,
    pub status: HealthStatus,
    /// Recent mean swing over historical mean swing, minus one.
    pub amplitude_change: f64,
    /// Relative distance between the recent measured period and the nominal wavelength.
    pub period_drift: f64,
    pub spacing_cv: f64,
}

impl CycleHealth {
    fn insufficient() -> Self {
        Self {
            score: 50.0,
            status: HealthStatus::Insufficient,
            amplitude_change: 0.0,
            period_drift: 0.0,
            spacing_cv: 0.0,
        }
    }
}

/// Compare the last few cycles of a component against everything before them.
pub fn cycle_health(swings: &[SwingPoint], wavelength: f64, component_len: usize) -> CycleHealth {
    if swings.len() < MIN_SWINGS || wavelength <= 0.0 {
        return CycleHealth::insufficient();
    }

    let cutoff = component_len as f64 - HEALTH_LOOKBACK_CYCLES * wavelength;
    let split = swings
        .iter()
        .position(|s| s.index as f64 >= cutoff)
        .unwrap_or(swings.len());
    // The swing straddling the boundary belongs to both regimes.
    let historical = &swings[..split.min(swings.len())];
    let recent = &swings[split.saturating_sub(1)..];

    let historical_amp = mean_or_zero(&swing_amplitudes(historical));
    let recent_amp = mean_or_zero(&swing_amplitudes(recent));
    let amplitude_change = if historical_amp > f64::EPSILON && recent.len() >= 2 {
        recent_amp / historical_amp - 1.0
    } else {
        0.0
    };

    let mut spacings = same_kind_spacings(recent);
    if spacings.is_empty() {
        spacings = same_kind_spacings(swings);
    }
    let period_drift = if spacings.is_empty() {
        0.0
    } else {
        (mean_or_zero(&spacings) - wavelength).abs() / wavelength
    };
    let spacing_cv = coefficient_of_variation(&spacings).unwrap_or(0.0);

    let mut deductions = 0.0;
    deductions += match amplitude_change {
        c if c <= -0.5 => 40.0,
        c if c <= -0.25 => 25.0,
        c if c <= -0.1 => 10.0,
        _ => 0.0,
    };
    deductions += match period_drift {
        d if d > 0.2 => 35.0,
        d if d > 0.1 => 20.0,
        d if d > 0.05 => 10.0,
        _ => 0.0,
    };
    deductions += match spacing_cv {
        cv if cv > 0.25 => 15.0,
        cv if cv > 0.15 => 8.0,
        _ => 0.0,
    };

    let score = (100.0_f64 - deductions).max(0.0);
    let status = if score >= 80.0 {
        HealthStatus::Healthy
    } else if score >= 60.0 {
        HealthStatus::Degrading
    } else {
        HealthStatus::Unstable
    };

    CycleHealth {
        score,
        status,
        amplitude_change,
        period_drift,
        spacing_cv,
    }
}
