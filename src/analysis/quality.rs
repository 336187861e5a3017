use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::analysis::detrend::{detrend, log_prices};
use crate::analysis::harmonics::{family_of, harmonic_families, HarmonicFamily};
use crate::analysis::health::{cycle_health, CycleHealth};
use crate::analysis::kernel::{CycleKernel, LinearCappedQuality};
use crate::analysis::peaks::{select_peaks, SpectralPeak};
use crate::analysis::significance::{bartels_score, BartelsScore};
use crate::analysis::spectrum::PowerSpectrum;
use crate::analysis::stats::{coefficient_of_variation, mean_or_zero};
use crate::analysis::swings::{detect_swings, same_kind_spacings, swing_amplitudes};
use crate::data::{PriceSeries, Wavelength};
use crate::error::{EngineError, Result};

/// Peaks below this normalized power do not count as competitors or family members.
pub const DETECTION_MIN_HEIGHT: f64 = 0.1;
/// Cycles of component extracted for the stationarity metrics.
const COMPONENT_CYCLES: f64 = 3.0;
/// Background bands sit between these many grid steps from the peak.
const BACKGROUND_INNER: usize = 10;
const BACKGROUND_OUTER: usize = 30;
/// SNR reported when the background carries no power.
const MAX_SNR: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum QualityClass {
    A,
    B,
    C,
    D,
}

impl fmt::Display for QualityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            QualityClass::A => "A",
            QualityClass::B => "B",
            QualityClass::C => "C",
            QualityClass::D => "D",
        };
        f.write_str(letter)
    }
}

/// Raw per-cycle measurements feeding the classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub amplitude_stationarity: f64,
    pub frequency_stationarity: f64,
    pub isolation: f64,
    pub snr: f64,
    pub gain_rank: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleQualityScore {
    pub wavelength: Wavelength,
    pub calendar_days: f64,
    pub power: f64,
    pub metrics: QualityMetrics,
    pub family: HarmonicFamily,
    pub orphan: bool,
    pub class: QualityClass,
    /// 0-100.
    pub score: f64,
    /// 1-4.
    pub stars: u8,
    pub bartels: BartelsScore,
    pub health: CycleHealth,
}

/// Spectral context shared by every cycle scored against one spectrum.
struct PeakContext {
    peaks: Vec<SpectralPeak>,
    families: Vec<HarmonicFamily>,
}

impl PeakContext {
    fn new(spectrum: &PowerSpectrum) -> Self {
        let peaks = select_peaks(spectrum, DETECTION_MIN_HEIGHT, 1, usize::MAX);
        let wavelengths: Vec<Wavelength> = peaks.iter().map(|p| p.wavelength).collect();
        Self {
            families: harmonic_families(&wavelengths),
            peaks,
        }
    }

    fn gain_rank(&self, grid_index: usize) -> usize {
        self.peaks
            .iter()
            .position(|p| p.grid_index == grid_index)
            .map(|pos| pos + 1)
            .unwrap_or(self.peaks.len() + 1)
    }

    /// Nearest other detected peak by wavelength.
    fn nearest_competitor(&self, grid_index: usize, wavelength: f64) -> Option<&SpectralPeak> {
        self.peaks
            .iter()
            .filter(|p| p.grid_index != grid_index)
            .min_by(|a, b| {
                (a.wavelength.bars() - wavelength)
                    .abs()
                    .total_cmp(&(b.wavelength.bars() - wavelength).abs())
            })
    }
}

/// Quality of one grid wavelength of `spectrum`, measured on the window the spectrum covers.
pub fn score_cycle(
    spectrum: &PowerSpectrum,
    wavelength: Wavelength,
    series: &PriceSeries,
) -> Result<CycleQualityScore> {
    let context = PeakContext::new(spectrum);
    score_with_context(spectrum, wavelength, series, &context)
}

/// Score the strongest `top_n` spectral peaks, sharing one harmonic-family computation.
pub fn score_cycles(
    spectrum: &PowerSpectrum,
    series: &PriceSeries,
    top_n: usize,
) -> Result<Vec<CycleQualityScore>> {
    let context = PeakContext::new(spectrum);
    let peaks: Vec<SpectralPeak> = context.peaks.iter().take(top_n).copied().collect();
    score_in_context(spectrum, series, &peaks, &context)
}

/// Score an externally selected set of peaks against the spectrum they came from.
pub fn score_peaks(
    spectrum: &PowerSpectrum,
    series: &PriceSeries,
    peaks: &[SpectralPeak],
) -> Result<Vec<CycleQualityScore>> {
    let context = PeakContext::new(spectrum);
    score_in_context(spectrum, series, peaks, &context)
}

fn score_in_context(
    spectrum: &PowerSpectrum,
    series: &PriceSeries,
    peaks: &[SpectralPeak],
    context: &PeakContext,
) -> Result<Vec<CycleQualityScore>> {
    peaks
        .iter()
        .map(|peak| score_with_context(spectrum, peak.wavelength, series, context))
        .collect()
}

fn score_with_context(
    spectrum: &PowerSpectrum,
    wavelength: Wavelength,
    series: &PriceSeries,
    context: &PeakContext,
) -> Result<CycleQualityScore> {
    let grid_index = spectrum
        .index_of(wavelength)
        .ok_or(EngineError::InvalidWavelength {
            wavelength: wavelength.bars(),
            reason: "not on the spectrum grid",
        })?;
    if series.len() < spectrum.window_size {
        return Err(EngineError::insufficient(spectrum.window_size, series.len()));
    }

    let w = wavelength.bars();
    let closes = series.closes();
    let window = &closes[closes.len() - spectrum.window_size..];
    let component = extract_component(window, w);
    let swings = detect_swings(&component, w);

    let amplitude_stationarity = coefficient_of_variation(&swing_amplitudes(&swings))
        .map(|cv| (-2.0 * cv).exp())
        .unwrap_or(0.0);

    let spacings = same_kind_spacings(&swings);
    let frequency_stationarity = match coefficient_of_variation(&spacings) {
        Some(cv) => {
            let deviation = (mean_or_zero(&spacings) - w).abs() / w;
            (-2.0 * cv - deviation).exp()
        }
        None => 0.0,
    };

    let power = spectrum.power[grid_index];
    let isolation = isolation(power, w, context.nearest_competitor(grid_index, w));
    let snr = signal_to_noise(&spectrum.power, grid_index);
    let gain_rank = context.gain_rank(grid_index);

    let metrics = QualityMetrics {
        amplitude_stationarity,
        frequency_stationarity,
        isolation,
        snr,
        gain_rank,
    };
    let family = family_of(&context.families, wavelength);
    let class = classify(&metrics);
    let score = numeric_score(class, &metrics);
    let stars = star_rating(snr, family.partners());

    debug!(
        wavelength = w,
        %class,
        score,
        stars,
        gain_rank,
        "scored cycle"
    );

    Ok(CycleQualityScore {
        wavelength,
        calendar_days: wavelength.to_calendar_days(spectrum.calendar_days_per_bar),
        power,
        metrics,
        orphan: family.is_orphan(),
        family,
        class,
        score,
        stars,
        bartels: bartels_score(&component, w),
        health: cycle_health(&swings, w, component.len()),
    })
}

/// Band-limited cycle component of a price window.
pub fn extract_component(window: &[f64], wavelength: f64) -> Vec<f64> {
    let data = detrend(&log_prices(window), 1);
    let support = ((COMPONENT_CYCLES * wavelength).round() as usize).clamp(1, data.len().max(1));
    CycleKernel::new(wavelength, support, &LinearCappedQuality::default()).component(&data)
}

fn isolation(power: f64, wavelength: f64, nearest: Option<&SpectralPeak>) -> f64 {
    let Some(nearest) = nearest else {
        return 1.0;
    };
    let separation = ((nearest.wavelength.bars() - wavelength).abs() / wavelength).min(1.0);
    let dominance = if nearest.power > f64::EPSILON {
        (power / nearest.power - 1.0).tanh()
    } else {
        1.0
    };
    (0.5 * separation + 0.5 * dominance).clamp(0.0, 1.0)
}

/// Peak power over the mean power of the two background bands either side of it.
pub fn signal_to_noise(power: &[f64], idx: usize) -> f64 {
    let n = power.len();
    let left = idx.saturating_sub(BACKGROUND_OUTER)..idx.saturating_sub(BACKGROUND_INNER);
    let right = (idx + BACKGROUND_INNER + 1).min(n)..(idx + BACKGROUND_OUTER + 1).min(n);
    let background: Vec<f64> = power[left].iter().chain(&power[right]).copied().collect();
    let noise = mean_or_zero(&background);
    if noise <= f64::EPSILON {
        MAX_SNR
    } else {
        (power[idx] / noise).min(MAX_SNR)
    }
}

pub fn classify(metrics: &QualityMetrics) -> QualityClass {
    let QualityMetrics {
        amplitude_stationarity: amp,
        frequency_stationarity: freq,
        isolation: iso,
        snr,
        gain_rank: rank,
    } = *metrics;

    if amp > 0.8 && freq > 0.8 && rank == 1 && iso > 0.7 && snr > 5.0 {
        QualityClass::A
    } else if amp > 0.7 && freq > 0.7 && rank <= 2 && iso > 0.6 && snr > 3.0 {
        QualityClass::B
    } else if amp > 0.6 && freq > 0.6 && rank <= 2 && snr > 2.0 {
        QualityClass::C
    } else {
        QualityClass::D
    }
}

pub fn numeric_score(class: QualityClass, metrics: &QualityMetrics) -> f64 {
    let base = match class {
        QualityClass::A => 90.0,
        QualityClass::B => 75.0,
        QualityClass::C => 60.0,
        QualityClass::D => 40.0,
    };
    (base
        + 3.0 * metrics.amplitude_stationarity
        + 3.0 * metrics.frequency_stationarity
        + 2.0 * metrics.isolation
        + 0.5 * metrics.snr.min(10.0))
    .clamp(0.0, 100.0)
}

/// One to four stars from SNR and the number of harmonic partners.
pub fn star_rating(snr: f64, partners: usize) -> u8 {
    let snr_points = if snr >= 5.0 {
        50
    } else if snr >= 3.0 {
        40
    } else if snr >= 2.0 {
        25
    } else {
        10
    };
    let family_points = match partners {
        0 => 0,
        1 => 25,
        2 => 40,
        _ => 50,
    };
    match snr_points + family_points {
        p if p >= 80 => 4,
        p if p >= 60 => 3,
        p if p >= 40 => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(amp: f64, freq: f64, iso: f64, snr: f64, rank: usize) -> QualityMetrics {
        QualityMetrics {
            amplitude_stationarity: amp,
            frequency_stationarity: freq,
            isolation: iso,
            snr,
            gain_rank: rank,
        }
    }

    #[test]
    fn classification_tiers() {
        assert_eq!(classify(&metrics(0.9, 0.9, 0.8, 6.0, 1)), QualityClass::A);
        assert_eq!(classify(&metrics(0.9, 0.9, 0.8, 6.0, 2)), QualityClass::B);
        assert_eq!(classify(&metrics(0.65, 0.65, 0.1, 2.5, 2)), QualityClass::C);
        assert_eq!(classify(&metrics(0.9, 0.9, 0.9, 50.0, 3)), QualityClass::D);
        assert_eq!(classify(&metrics(0.5, 0.9, 0.9, 50.0, 1)), QualityClass::D);
    }

    #[test]
    fn numeric_score_is_bounded() {
        let best = metrics(1.0, 1.0, 1.0, 100.0, 1);
        assert_eq!(numeric_score(QualityClass::A, &best), 100.0);
        let worst = metrics(0.0, 0.0, 0.0, 0.0, 9);
        assert_eq!(numeric_score(QualityClass::D, &worst), 40.0);
    }

    #[test]
    fn stars_combine_snr_and_family() {
        assert_eq!(star_rating(6.0, 3), 4);
        assert_eq!(star_rating(6.0, 0), 2);
        assert_eq!(star_rating(3.5, 1), 3);
        assert_eq!(star_rating(1.0, 0), 1);
        assert_eq!(star_rating(1.0, 3), 3);
    }

    #[test]
    fn isolation_without_competitor_is_full() {
        assert_eq!(isolation(0.5, 40.0, None), 1.0);
    }

    #[test]
    fn snr_against_flat_background() {
        let mut power = vec![0.1; 100];
        power[50] = 1.0;
        assert!((signal_to_noise(&power, 50) - 10.0).abs() < 1e-9);
        let mut empty = vec![0.0; 100];
        empty[50] = 1.0;
        assert_eq!(signal_to_noise(&empty, 50), MAX_SNR);
    }
}
