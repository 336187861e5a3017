use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::analysis::detrend::{detrend, log_prices, suppress_long_cycles};
use crate::analysis::kernel::{CycleKernel, QualityFactor};
use crate::data::{PriceSeries, Wavelength, WavelengthGrid};
use crate::error::{EngineError, Result};
use crate::options::{SpectrumOptions, MAX_ENHANCEMENT_FACTOR, MIN_WINDOW_SIZE};

/// Cycle strength per grid wavelength for one analysis window.
#[derive(Debug, Clone, Serialize)]
pub struct PowerSpectrum {
    pub wavelengths: Vec<Wavelength>,
    /// Post-processed power before normalization.
    pub raw: Vec<f64>,
    /// `raw / normalization`, in [0, 1] when normalized by its own maximum.
    pub power: Vec<f64>,
    pub normalization: f64,
    pub window_size: usize,
    pub grid_step: f64,
    pub calendar_days_per_bar: f64,
}

impl PowerSpectrum {
    pub(crate) fn from_raw(
        grid: &WavelengthGrid,
        raw: Vec<f64>,
        window_size: usize,
        calendar_days_per_bar: f64,
    ) -> Self {
        let normalization = raw.iter().copied().fold(0.0, f64::max);
        let mut spectrum = Self {
            wavelengths: grid.wavelengths().to_vec(),
            power: Vec::new(),
            raw,
            normalization,
            window_size,
            grid_step: grid.step(),
            calendar_days_per_bar,
        };
        spectrum.renormalize(normalization);
        spectrum
    }

    /// Re-express `power` against another normalization factor (e.g. a heatmap's global max).
    pub fn renormalize(&mut self, normalization: f64) {
        self.normalization = normalization;
        self.power = if normalization > 0.0 {
            self.raw.iter().map(|v| v / normalization).collect()
        } else {
            vec![0.0; self.raw.len()]
        };
    }

    pub fn len(&self) -> usize {
        self.wavelengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelengths.is_empty()
    }

    pub fn index_of(&self, wavelength: Wavelength) -> Option<usize> {
        let tolerance = self.grid_step * 1e-6;
        self.wavelengths
            .iter()
            .position(|w| (w.bars() - wavelength.bars()).abs() <= tolerance)
    }

    pub fn power_at(&self, wavelength: Wavelength) -> Option<f64> {
        self.index_of(wavelength).map(|idx| self.power[idx])
    }
}

/// Power spectrum of the most recent `window_size` bars.
pub fn compute_spectrum(
    series: &PriceSeries,
    grid: &WavelengthGrid,
    window_size: usize,
    options: &SpectrumOptions,
) -> Result<PowerSpectrum> {
    check_window(series, window_size, options)?;
    let closes = series.closes();
    let window = &closes[closes.len() - window_size..];
    let raw = raw_spectrum(window, grid, options);
    debug!(
        window_size,
        wavelengths = grid.len(),
        "computed live spectrum"
    );
    Ok(PowerSpectrum::from_raw(
        grid,
        raw,
        window_size,
        series.calendar_days_per_bar(),
    ))
}

pub(crate) fn check_window(
    series: &PriceSeries,
    window_size: usize,
    options: &SpectrumOptions,
) -> Result<()> {
    options.validate()?;
    if window_size < MIN_WINDOW_SIZE {
        return Err(EngineError::InvalidOptions(format!(
            "window size {window_size} is below the minimum of {MIN_WINDOW_SIZE} bars"
        )));
    }
    if series.len() < window_size {
        return Err(EngineError::insufficient(window_size, series.len()));
    }
    Ok(())
}

/// Full unnormalized pipeline for one window of closing prices.
pub(crate) fn raw_spectrum(
    window: &[f64],
    grid: &WavelengthGrid,
    options: &SpectrumOptions,
) -> Vec<f64> {
    let data = prepare_window(window, options);
    let quality = options.quality.as_ref();

    let scanned: Vec<f64> = grid
        .wavelengths()
        .par_iter()
        .map(|w| wavelet_power(&data, w.bars(), quality))
        .collect();

    let filtered = median_filter(&scanned, options.median_radius);
    let smoothed = gaussian_smooth(&filtered, options.smoothing_radius);
    let mut enhanced = enhance_peaks(&smoothed, options.enhancement_factor);

    for (value, w) in enhanced.iter_mut().zip(grid.wavelengths()) {
        if !is_supported(w.bars(), data.len()) || !value.is_finite() {
            *value = 0.0;
        }
    }
    enhanced
}

fn prepare_window(window: &[f64], options: &SpectrumOptions) -> Vec<f64> {
    let mut data = log_prices(window);
    if let Some(high_pass) = &options.high_pass {
        data = suppress_long_cycles(&data, high_pass);
    }
    detrend(&data, options.detrend_degree)
}

fn is_supported(wavelength: f64, len: usize) -> bool {
    wavelength < len as f64 / 2.0
}

/// RMS kernel response across overlapping sub-windows of the detrended data.
pub fn wavelet_power(data: &[f64], wavelength: f64, quality: &dyn QualityFactor) -> f64 {
    let n = data.len();
    if !is_supported(wavelength, n) {
        return 0.0;
    }

    let support = CycleKernel::scan_support(wavelength, n);
    let kernel = CycleKernel::new(wavelength, support, quality);
    let stride = ((wavelength / 8.0) as usize).max(1);

    let mut total = 0.0;
    let mut count = 0usize;
    let mut start = 0usize;
    while start + support <= n {
        total += kernel.response_at(data, start).norm_sqr();
        count += 1;
        start += stride;
    }

    if count > 0 {
        (total / count as f64).sqrt()
    } else {
        0.0
    }
}

/// Running median over `2 * radius + 1` bins (truncated at the edges). A single-bin spike can
/// never survive a radius of 1 or more.
pub fn median_filter(values: &[f64], radius: usize) -> Vec<f64> {
    if radius == 0 {
        return values.to_vec();
    }
    let n = values.len();
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius + 1).min(n);
            let mut window = values[lo..hi].to_vec();
            window.sort_by(|a, b| a.total_cmp(b));
            window[window.len() / 2]
        })
        .collect()
}

/// Gaussian-weighted moving average, sigma = radius / 3, renormalized at the edges.
pub fn gaussian_smooth(values: &[f64], radius: usize) -> Vec<f64> {
    if radius == 0 {
        return values.to_vec();
    }
    let n = values.len();
    let sigma = radius as f64 / 3.0;
    let weights: Vec<f64> = (0..=radius)
        .map(|j| (-0.5 * (j * j) as f64 / (sigma * sigma)).exp())
        .collect();

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius).min(n - 1);
            let mut sum = 0.0;
            let mut weight = 0.0;
            for (idx, value) in values.iter().enumerate().take(hi + 1).skip(lo) {
                let w = weights[idx.abs_diff(i)];
                sum += value * w;
                weight += w;
            }
            sum / weight
        })
        .collect()
}

/// Stretch power above the mean by `factor`, leaving everything else alone.
///
/// The mapping is continuous and strictly increasing, so it keeps the ordering of every pair of
/// bins: local maxima stay where they were and no new ones appear.
pub fn enhance_peaks(values: &[f64], factor: f64) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let factor = factor.clamp(1.0, MAX_ENHANCEMENT_FACTOR);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values
        .iter()
        .map(|&v| if v > mean { mean + (v - mean) * factor } else { v })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::kernel::LinearCappedQuality;

    fn local_maxima(values: &[f64]) -> Vec<usize> {
        (1..values.len() - 1)
            .filter(|&i| values[i] > values[i - 1] && values[i] > values[i + 1])
            .collect()
    }

    #[test]
    fn median_filter_removes_single_spike() {
        let mut values = vec![1.0; 21];
        values[10] = 9.0;
        let filtered = median_filter(&values, 1);
        assert!(filtered.iter().all(|v| *v == 1.0));
    }

    #[test]
    fn median_filter_keeps_broad_peak() {
        let values = vec![0.0, 1.0, 2.0, 3.0, 2.0, 1.0, 0.0];
        let filtered = median_filter(&values, 1);
        assert_eq!(filtered[3], 2.0);
        assert_eq!(local_maxima(&filtered).len(), 0);
        let argmax = filtered
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!((2..=4).contains(&argmax));
    }

    #[test]
    fn smoothing_preserves_constant_and_peak_location() {
        assert!(gaussian_smooth(&[2.5; 30], 3)
            .iter()
            .all(|v| (v - 2.5).abs() < 1e-12));

        let bump: Vec<f64> = (0..41)
            .map(|i| (-((i as f64 - 20.0).powi(2)) / 18.0).exp())
            .collect();
        let smoothed = gaussian_smooth(&bump, 3);
        assert_eq!(local_maxima(&smoothed), vec![20]);
        assert!(smoothed[20] <= bump[20]);
    }

    #[test]
    fn enhancement_is_monotone_and_adds_no_maxima() {
        let values = vec![0.1, 0.5, 0.3, 0.9, 0.2, 0.4, 0.35, 0.05];
        let enhanced = enhance_peaks(&values, 2.0);
        assert_eq!(local_maxima(&values), local_maxima(&enhanced));
        for i in 0..values.len() {
            for j in 0..values.len() {
                if values[i] < values[j] {
                    assert!(enhanced[i] < enhanced[j]);
                }
            }
        }
    }

    #[test]
    fn enhancement_factor_is_bounded() {
        let values = vec![0.0, 1.0];
        let enhanced = enhance_peaks(&values, 100.0);
        assert_eq!(enhanced[1], 0.5 + 0.5 * MAX_ENHANCEMENT_FACTOR);
    }

    #[test]
    fn unsupported_wavelength_has_zero_power() {
        let quality = LinearCappedQuality::default();
        let data: Vec<f64> = (0..200).map(|t| (t as f64 * 0.1).sin()).collect();
        assert_eq!(wavelet_power(&data, 100.0, &quality), 0.0);
        assert_eq!(wavelet_power(&data, 150.0, &quality), 0.0);
        assert!(wavelet_power(&data, 60.0, &quality) > 0.0);
    }

    #[test]
    fn masked_bins_stay_zero_after_post_processing() {
        let window: Vec<f64> = (0..300)
            .map(|t| 100.0 + 5.0 * (2.0 * std::f64::consts::PI * t as f64 / 140.0).sin())
            .collect();
        let grid = WavelengthGrid::new(100.0, 200.0, 5.0).unwrap();
        let raw = raw_spectrum(&window, &grid, &SpectrumOptions::default());
        for (value, w) in raw.iter().zip(grid.wavelengths()) {
            if w.bars() >= 150.0 {
                assert_eq!(*value, 0.0);
            } else {
                assert!(*value > 0.0);
            }
        }
    }
}
