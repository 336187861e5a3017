use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::bandpass::{compute_bandpass, BandpassResult};
use crate::analysis::heatmap::{compute_heatmap_with, Heatmap, HeatmapSchedule};
use crate::analysis::peaks::{select_peaks, SpectralPeak};
use crate::analysis::quality::{score_peaks, CycleQualityScore};
use crate::analysis::spectrum::{compute_spectrum, PowerSpectrum};
use crate::data::PriceSeries;
use crate::error::{EngineError, Result};
use crate::options::EngineOptions;

/// Everything one analysis run produces for a single price series.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub bars: usize,
    /// Live spectrum; scaled by the heatmap's global maximum when a heatmap was built.
    pub spectrum: PowerSpectrum,
    /// `None` when disabled or when the history is too short for the requested weeks.
    pub heatmap: Option<Heatmap>,
    pub peaks: Vec<SpectralPeak>,
    /// One entry per peak, same order.
    pub quality: Vec<CycleQualityScore>,
    /// Oscillators for the peaks that have enough history, strongest first.
    pub bandpass: Vec<BandpassResult>,
}

impl CycleReport {
    pub fn dominant(&self) -> Option<&SpectralPeak> {
        self.peaks.first()
    }
}

/// Spectrum, heatmap, peaks, quality and bandpass oscillators in one pass.
pub fn analyze(series: &PriceSeries, options: &EngineOptions) -> Result<CycleReport> {
    options.validate()?;
    let grid = options.grid()?;

    let heatmap = if options.heatmap_weeks == 0 {
        None
    } else {
        let schedule = HeatmapSchedule {
            bars_per_week: options.bars_per_week,
            week_step: options.week_step,
        };
        match compute_heatmap_with(
            series,
            &grid,
            options.window_size,
            options.heatmap_weeks,
            schedule,
            &options.spectrum,
        ) {
            Ok(heatmap) => Some(heatmap),
            Err(err @ EngineError::InsufficientData { .. }) => {
                warn!(%err, "skipping heatmap");
                None
            }
            Err(err) => return Err(err),
        }
    };

    // With a heatmap the live spectrum is its newest column, on the shared scale.
    let spectrum = match &heatmap {
        Some(heatmap) => heatmap.live.clone(),
        None => compute_spectrum(series, &grid, options.window_size, &options.spectrum)?,
    };

    let peaks = select_peaks(
        &spectrum,
        options.min_peak_height,
        options.min_peak_spacing,
        options.top_peaks,
    );
    let quality = score_peaks(&spectrum, series, &peaks)?;

    let mut bandpass = Vec::with_capacity(peaks.len());
    for peak in &peaks {
        match compute_bandpass(
            series,
            peak.wavelength,
            options.align_to,
            options.projection_length,
        ) {
            Ok(result) => bandpass.push(result),
            Err(err) => warn!(wavelength = peak.wavelength.bars(), %err, "no bandpass"),
        }
    }

    info!(
        bars = series.len(),
        peaks = peaks.len(),
        heatmap = heatmap.is_some(),
        "analysis complete"
    );

    Ok(CycleReport {
        bars: series.len(),
        spectrum,
        heatmap,
        peaks,
        quality,
        bandpass,
    })
}
