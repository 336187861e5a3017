use std::sync::Arc;

use serde::Serialize;

use crate::analysis::kernel::{LinearCappedQuality, QualityFactor};
use crate::data::{TurningKind, WavelengthGrid};
use crate::error::{EngineError, Result};

/// Smallest analysis window the spectrum engine accepts.
pub const MIN_WINDOW_SIZE: usize = 8;

/// Upper bound on the peak-enhancement factor; larger values start to flatten everything but
/// the tallest bins.
pub const MAX_ENHANCEMENT_FACTOR: f64 = 4.0;

/// Moving-average high-pass used to suppress cycles longer than the grid of interest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HighPassOptions {
    /// Longest moving-average period, in bars.
    pub max_period: usize,
    /// The filter is skipped when the effective period is not above this many bars.
    pub min_threshold: usize,
}

impl Default for HighPassOptions {
    fn default() -> Self {
        Self {
            max_period: 600,
            min_threshold: 50,
        }
    }
}

/// Everything the spectrum pipeline needs besides the series, grid and window.
#[derive(Debug, Clone)]
pub struct SpectrumOptions {
    /// Polynomial degree removed from the log prices before scanning.
    pub detrend_degree: usize,
    pub high_pass: Option<HighPassOptions>,
    /// Half-width (grid steps) of the spike-removing median filter; 0 disables it.
    pub median_radius: usize,
    /// Half-width (grid steps) of the Gaussian smoother; 0 disables it.
    pub smoothing_radius: usize,
    /// Gain applied to power above the spectrum mean; 1.0 disables enhancement.
    pub enhancement_factor: f64,
    pub quality: Arc<dyn QualityFactor>,
}

impl Default for SpectrumOptions {
    fn default() -> Self {
        Self {
            detrend_degree: 1,
            high_pass: None,
            median_radius: 1,
            smoothing_radius: 3,
            enhancement_factor: 2.0,
            quality: Arc::new(LinearCappedQuality::default()),
        }
    }
}

impl SpectrumOptions {
    pub fn validate(&self) -> Result<()> {
        if self.detrend_degree > 5 {
            return Err(EngineError::InvalidOptions(format!(
                "detrend degree {} is above the supported maximum of 5",
                self.detrend_degree
            )));
        }
        if !(self.enhancement_factor.is_finite()
            && (1.0..=MAX_ENHANCEMENT_FACTOR).contains(&self.enhancement_factor))
        {
            return Err(EngineError::InvalidOptions(format!(
                "enhancement factor must lie in [1, {MAX_ENHANCEMENT_FACTOR}], got {}",
                self.enhancement_factor
            )));
        }
        if let Some(high_pass) = &self.high_pass {
            if high_pass.max_period == 0 {
                return Err(EngineError::InvalidOptions(
                    "high-pass period must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Complete, explicit configuration for one analysis run.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub min_wavelength: f64,
    pub max_wavelength: f64,
    pub wavelength_step: f64,
    /// Bars per analysis window, shared by the live spectrum and every heatmap column.
    pub window_size: usize,
    /// Number of weekly offsets scanned by the heatmap; 0 skips the heatmap.
    pub heatmap_weeks: usize,
    pub bars_per_week: usize,
    /// Stride between scanned weeks.
    pub week_step: usize,
    pub align_to: TurningKind,
    /// Bars of oscillator projected past the last observation.
    pub projection_length: usize,
    pub min_peak_height: f64,
    pub min_peak_spacing: usize,
    pub top_peaks: usize,
    pub spectrum: SpectrumOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            min_wavelength: 20.0,
            max_wavelength: 400.0,
            wavelength_step: 1.0,
            window_size: 2000,
            heatmap_weeks: 104,
            bars_per_week: 5,
            week_step: 1,
            align_to: TurningKind::Trough,
            projection_length: 250,
            min_peak_height: 0.15,
            min_peak_spacing: 5,
            top_peaks: 8,
            spectrum: SpectrumOptions::default(),
        }
    }
}

impl EngineOptions {
    pub fn validate(&self) -> Result<()> {
        self.grid()?;
        self.spectrum.validate()?;
        if self.window_size < MIN_WINDOW_SIZE {
            return Err(EngineError::InvalidOptions(format!(
                "window size {} is below the minimum of {MIN_WINDOW_SIZE} bars",
                self.window_size
            )));
        }
        if self.bars_per_week == 0 || self.week_step == 0 {
            return Err(EngineError::InvalidOptions(
                "bars per week and week step must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_peak_height) {
            return Err(EngineError::InvalidOptions(format!(
                "minimum peak height must lie in [0, 1], got {}",
                self.min_peak_height
            )));
        }
        if self.top_peaks == 0 {
            return Err(EngineError::InvalidOptions(
                "at least one peak must be requested".to_string(),
            ));
        }
        Ok(())
    }

    pub fn grid(&self) -> Result<WavelengthGrid> {
        WavelengthGrid::new(
            self.min_wavelength,
            self.max_wavelength,
            self.wavelength_step,
        )
    }
}
