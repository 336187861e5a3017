use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::analysis::spectrum::{check_window, raw_spectrum, PowerSpectrum};
use crate::data::{PriceSeries, Wavelength, WavelengthGrid};
use crate::error::{EngineError, Result};
use crate::options::SpectrumOptions;

/// Layout of the rolling windows scanned by the heatmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeatmapSchedule {
    pub bars_per_week: usize,
    pub week_step: usize,
}

impl Default for HeatmapSchedule {
    fn default() -> Self {
        Self {
            bars_per_week: 5,
            week_step: 1,
        }
    }
}

/// Time-by-wavelength cycle strength, sharing one normalization with the live spectrum.
#[derive(Debug, Clone, Serialize)]
pub struct Heatmap {
    pub wavelengths: Vec<Wavelength>,
    /// Week offset (bars back = offset * bars_per_week) of every column; column 0 is the most
    /// recent window.
    pub week_offsets: Vec<usize>,
    /// `values[wavelength][column]`, normalized by `normalization`.
    pub values: Vec<Vec<f64>>,
    pub normalization: f64,
    pub window_size: usize,
    pub bars_per_week: usize,
    /// Live spectrum expressed against the same global maximum as the matrix.
    pub live: PowerSpectrum,
}

impl Heatmap {
    pub fn columns(&self) -> usize {
        self.week_offsets.len()
    }

    pub fn column(&self, idx: usize) -> Vec<f64> {
        self.values.iter().map(|row| row[idx]).collect()
    }

    pub fn max_value(&self) -> f64 {
        self.values
            .iter()
            .flatten()
            .chain(self.live.power.iter())
            .copied()
            .fold(0.0, f64::max)
    }

    /// Fraction of columns where the wavelength reaches `threshold`.
    pub fn persistence(&self, wavelength_idx: usize, threshold: f64) -> f64 {
        match self.values.get(wavelength_idx) {
            Some(row) if !row.is_empty() => {
                row.iter().filter(|v| **v >= threshold).count() as f64 / row.len() as f64
            }
            _ => 0.0,
        }
    }

    pub fn mean_strength(&self, wavelength_idx: usize) -> f64 {
        match self.values.get(wavelength_idx) {
            Some(row) if !row.is_empty() => row.iter().sum::<f64>() / row.len() as f64,
            _ => 0.0,
        }
    }
}

/// Run the spectrum pipeline over rolling windows stepping back one week at a time.
pub fn compute_heatmap(
    series: &PriceSeries,
    grid: &WavelengthGrid,
    window_size: usize,
    week_count: usize,
    options: &SpectrumOptions,
) -> Result<Heatmap> {
    compute_heatmap_with(
        series,
        grid,
        window_size,
        week_count,
        HeatmapSchedule::default(),
        options,
    )
}

pub fn compute_heatmap_with(
    series: &PriceSeries,
    grid: &WavelengthGrid,
    window_size: usize,
    week_count: usize,
    schedule: HeatmapSchedule,
    options: &SpectrumOptions,
) -> Result<Heatmap> {
    if week_count == 0 {
        return Err(EngineError::InvalidOptions(
            "heatmap needs at least one week".to_string(),
        ));
    }
    if schedule.bars_per_week == 0 || schedule.week_step == 0 {
        return Err(EngineError::InvalidOptions(
            "bars per week and week step must be positive".to_string(),
        ));
    }
    check_window(series, window_size, options)?;

    let week_offsets: Vec<usize> = (0..week_count).step_by(schedule.week_step).collect();
    let deepest = week_offsets.last().copied().unwrap_or(0);
    let required = window_size + deepest * schedule.bars_per_week;
    if series.len() < required {
        return Err(EngineError::insufficient(required, series.len()));
    }

    let closes = series.closes();
    let raw_columns: Vec<Vec<f64>> = week_offsets
        .par_iter()
        .map(|week| {
            let end = closes.len() - week * schedule.bars_per_week;
            raw_spectrum(&closes[end - window_size..end], grid, options)
        })
        .collect();

    // One maximum over every raw value; column 0 is the live spectrum itself.
    let normalization = raw_columns
        .iter()
        .flatten()
        .copied()
        .fold(0.0, f64::max);

    let mut live = PowerSpectrum::from_raw(
        grid,
        raw_columns[0].clone(),
        window_size,
        series.calendar_days_per_bar(),
    );
    live.renormalize(normalization);

    let scale = |v: f64| if normalization > 0.0 { v / normalization } else { 0.0 };
    let values: Vec<Vec<f64>> = (0..grid.len())
        .map(|w| raw_columns.iter().map(|column| scale(column[w])).collect())
        .collect();

    debug!(
        columns = week_offsets.len(),
        wavelengths = grid.len(),
        normalization,
        "computed heatmap"
    );

    Ok(Heatmap {
        wavelengths: grid.wavelengths().to_vec(),
        week_offsets,
        values,
        normalization,
        window_size,
        bars_per_week: schedule.bars_per_week,
        live,
    })
}
