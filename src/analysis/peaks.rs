use serde::Serialize;

use crate::analysis::spectrum::PowerSpectrum;
use crate::data::{TurningKind, Wavelength};

/// Minimum topographic prominence (in normalized power) for a spectral peak.
pub const MIN_PEAK_PROMINENCE: f64 = 0.02;

/// Local extremum of a sampled series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extremum {
    pub index: usize,
    pub value: f64,
    pub prominence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectralPeak {
    pub grid_index: usize,
    pub wavelength: Wavelength,
    pub power: f64,
    pub prominence: f64,
    pub calendar_days: f64,
}

/// Interior local maxima (or minima) with a minimum spacing and prominence.
///
/// Plateaus report their middle sample. Spacing is enforced from the most extreme candidate
/// down: anything closer than `min_distance` samples to an already kept extremum is dropped.
/// Results are ordered by index.
pub fn find_extrema(
    values: &[f64],
    kind: TurningKind,
    min_distance: usize,
    min_prominence: f64,
) -> Vec<Extremum> {
    let signal: Vec<f64> = match kind {
        TurningKind::Peak => values.to_vec(),
        TurningKind::Trough => values.iter().map(|v| -v).collect(),
    };
    let n = signal.len();
    if n < 3 {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    let mut i = 1;
    while i < n - 1 {
        if signal[i] > signal[i - 1] {
            let mut j = i;
            while j + 1 < n && signal[j + 1] == signal[i] {
                j += 1;
            }
            if j + 1 < n && signal[j + 1] < signal[i] {
                candidates.push((i + j) / 2);
            }
            i = j + 1;
        } else {
            i += 1;
        }
    }

    let kept = enforce_spacing(&signal, candidates, min_distance);

    kept.into_iter()
        .filter_map(|index| {
            let prominence = prominence(&signal, index);
            (prominence >= min_prominence).then(|| Extremum {
                index,
                value: values[index],
                prominence,
            })
        })
        .collect()
}

fn enforce_spacing(signal: &[f64], candidates: Vec<usize>, min_distance: usize) -> Vec<usize> {
    if min_distance <= 1 || candidates.len() < 2 {
        return candidates;
    }

    let mut by_height = candidates.clone();
    by_height.sort_by(|a, b| signal[*b].total_cmp(&signal[*a]).then(a.cmp(b)));

    let mut kept: Vec<usize> = Vec::with_capacity(candidates.len());
    for idx in by_height {
        if kept.iter().all(|k| k.abs_diff(idx) >= min_distance) {
            kept.push(idx);
        }
    }
    kept.sort_unstable();
    kept
}

/// Height above the higher of the two bases reached before meeting taller ground.
fn prominence(signal: &[f64], peak: usize) -> f64 {
    let height = signal[peak];

    let mut left_min = height;
    for &v in signal[..peak].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    for &v in &signal[peak + 1..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}

/// Dominant wavelengths of a spectrum, strongest first.
pub fn select_peaks(
    spectrum: &PowerSpectrum,
    min_height: f64,
    min_spacing_steps: usize,
    top_n: usize,
) -> Vec<SpectralPeak> {
    let mut peaks: Vec<SpectralPeak> = find_extrema(
        &spectrum.power,
        TurningKind::Peak,
        min_spacing_steps,
        MIN_PEAK_PROMINENCE,
    )
    .into_iter()
    .filter(|e| e.value >= min_height)
    .map(|e| {
        let wavelength = spectrum.wavelengths[e.index];
        SpectralPeak {
            grid_index: e.index,
            wavelength,
            power: e.value,
            prominence: e.prominence,
            calendar_days: wavelength.to_calendar_days(spectrum.calendar_days_per_bar),
        }
    })
    .collect();

    peaks.sort_by(|a, b| {
        b.power
            .total_cmp(&a.power)
            .then(a.grid_index.cmp(&b.grid_index))
    });
    peaks.truncate(top_n);
    peaks
}
