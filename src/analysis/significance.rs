use serde::Serialize;

use crate::analysis::quality::QualityClass;
use crate::analysis::stats::{coefficient_of_variation, mean_or_zero, pearson};

/// Scores at or above this are treated as a genuine (non-random) cycle.
pub const BARTELS_SIGNIFICANCE_THRESHOLD: f64 = 49.0;

/// Bartels-style persistence test of a cycle component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BartelsScore {
    /// 0-100.
    pub score: f64,
    /// Lag-one-wavelength autocorrelation mapped from [-1, 1] to [0, 1].
    pub autocorrelation: f64,
    /// Mean absolute correlation between consecutive one-wavelength segments.
    pub segment_correlation: f64,
    /// `exp(-cv)` of the per-segment peak amplitudes.
    pub amplitude_consistency: f64,
    pub significant: bool,
    pub rating: QualityClass,
}

impl BartelsScore {
    fn from_parts(
        autocorrelation: f64,
        segment_correlation: f64,
        amplitude_consistency: f64,
    ) -> Self {
        let score = (100.0
            * (0.4 * autocorrelation + 0.4 * segment_correlation + 0.2 * amplitude_consistency))
            .clamp(0.0, 100.0);
        let rating = if score >= 75.0 {
            QualityClass::A
        } else if score >= 60.0 {
            QualityClass::B
        } else if score >= BARTELS_SIGNIFICANCE_THRESHOLD {
            QualityClass::C
        } else {
            QualityClass::D
        };
        Self {
            score,
            autocorrelation,
            segment_correlation,
            amplitude_consistency,
            significant: score >= BARTELS_SIGNIFICANCE_THRESHOLD,
            rating,
        }
    }
}

/// Needs at least two full wavelengths of component; shorter input scores zero.
pub fn bartels_score(component: &[f64], wavelength: f64) -> BartelsScore {
    let lag = wavelength.round() as usize;
    let n = component.len();
    if lag == 0 || n < 2 * lag {
        return BartelsScore::from_parts(0.0, 0.0, 0.0);
    }

    let autocorrelation = (pearson(&component[..n - lag], &component[lag..]) + 1.0) / 2.0;

    let segments: Vec<&[f64]> = component.chunks_exact(lag).collect();
    let correlations: Vec<f64> = segments
        .windows(2)
        .map(|pair| pearson(pair[0], pair[1]).abs())
        .collect();
    let segment_correlation = mean_or_zero(&correlations);

    let amplitudes: Vec<f64> = segments
        .iter()
        .map(|s| s.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())))
        .collect();
    let amplitude_consistency = coefficient_of_variation(&amplitudes)
        .map(|cv| (-cv).exp())
        .unwrap_or(0.0);

    BartelsScore::from_parts(autocorrelation, segment_correlation, amplitude_consistency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn clean_cycle_is_significant() {
        let wave: Vec<f64> = (0..400).map(|t| (2.0 * PI * t as f64 / 40.0).sin()).collect();
        let score = bartels_score(&wave, 40.0);
        assert!(score.score > 95.0, "{score:?}");
        assert!(score.significant);
        assert_eq!(score.rating, QualityClass::A);
    }

    #[test]
    fn short_component_scores_zero() {
        let score = bartels_score(&[1.0, -1.0, 1.0], 40.0);
        assert_eq!(score.score, 0.0);
        assert!(!score.significant);
        assert_eq!(score.rating, QualityClass::D);
    }

    #[test]
    fn phase_flipping_cycle_loses_autocorrelation() {
        let wave: Vec<f64> = (0..400)
            .map(|t| {
                let sign = if (t / 40) % 2 == 0 { 1.0 } else { -1.0 };
                sign * (2.0 * PI * t as f64 / 40.0).sin()
            })
            .collect();
        let score = bartels_score(&wave, 40.0);
        assert!(score.autocorrelation < 0.05);
        assert!((score.segment_correlation - 1.0).abs() < 1e-9);
        assert!((score.score - 60.0).abs() < 1e-6);
    }
}
