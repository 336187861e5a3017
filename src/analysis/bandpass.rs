use std::f64::consts::FRAC_PI_2;

use serde::Serialize;
use statrs::statistics::Statistics;
use tracing::{debug, warn};

use crate::analysis::detrend::detrend;
use crate::analysis::peaks::find_extrema;
use crate::data::{PriceSeries, TurningKind, Wavelength};
use crate::error::{EngineError, Result};

/// Polynomial degree removed from prices before turning points are searched.
const BANDPASS_DETREND_DEGREE: usize = 3;
/// Turning points are searched in the last `SEARCH_CYCLES` wavelengths.
const SEARCH_CYCLES: f64 = 3.0;
/// Minimum spacing between turning points of one kind, in wavelengths.
const MIN_SPACING_CYCLES: f64 = 0.4;
/// Required prominence, relative to the standard deviation of the search window.
const PROMINENCE_STD_FRACTION: f64 = 0.2;
/// Turning points closer than this many wavelengths to the last bar are still developing.
pub const CONFIRMATION_CYCLES: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnchorConfidence {
    /// Confirmed turning point of the requested kind.
    Confirmed,
    /// No confirmed turning point of the requested kind; the most recent confirmed one of the
    /// other kind was used.
    Substituted,
    /// Nothing confirmed in the search window; the most extreme eligible bar was used.
    Unconfirmed,
}

/// Price turning point the oscillator phase is locked to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TurningAnchor {
    pub index: usize,
    pub kind: TurningKind,
    pub confidence: AnchorConfidence,
    /// Detrended price at the anchor.
    pub value: f64,
}

/// Analytically derived oscillator extremum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TurningLabel {
    pub kind: TurningKind,
    /// Exact bar position; fractional when half a wavelength is not a whole number of bars.
    pub position: f64,
    /// Nearest bar to `position`. The oscillator is exactly +/-1 only at `position`; when the
    /// position is fractional, `samples[index]` is slightly inside that bound. Use
    /// [`BandpassResult::value_at`] for the exact extremum.
    pub index: usize,
    pub projected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BandpassResult {
    pub wavelength: Wavelength,
    /// Oscillator over the observed bars followed by the projection.
    pub samples: Vec<f64>,
    pub history_len: usize,
    pub phase_offset: f64,
    pub anchor: TurningAnchor,
    /// Confirmed historical peaks, oldest first.
    pub peaks: Vec<TurningLabel>,
    /// Confirmed historical troughs, oldest first.
    pub troughs: Vec<TurningLabel>,
    pub projected_peaks: Vec<TurningLabel>,
    pub projected_troughs: Vec<TurningLabel>,
    pub next_peak: TurningLabel,
    pub next_trough: TurningLabel,
    /// Oscillator phase at the last observed bar, degrees in [0, 360).
    pub phase_degrees: f64,
    /// Least-squares amplitude of the oscillator inside the detrended prices.
    pub amplitude: f64,
    #[serde(skip)]
    pub fallback: Option<EngineError>,
}

impl BandpassResult {
    /// Oscillator value at any (possibly fractional) bar position.
    pub fn value_at(&self, position: f64) -> f64 {
        (self.wavelength.omega() * position + self.phase_offset).sin()
    }

    pub fn is_low_confidence(&self) -> bool {
        self.anchor.confidence == AnchorConfidence::Unconfirmed
    }

    pub fn projection(&self) -> &[f64] {
        &self.samples[self.history_len..]
    }
}

pub fn is_confirmed(index: usize, len: usize, wavelength: f64) -> bool {
    index < len && (len - 1 - index) as f64 >= CONFIRMATION_CYCLES * wavelength
}

/// Phase-locked sine for one wavelength, anchored to the most recent confirmed turning point.
pub fn compute_bandpass(
    series: &PriceSeries,
    wavelength: Wavelength,
    align_to: TurningKind,
    projection_length: usize,
) -> Result<BandpassResult> {
    let n = series.len();
    let required = ((2.0 * wavelength.bars()).ceil() as usize).max(8);
    if n < required {
        return Err(EngineError::insufficient(required, n));
    }

    let detrended = detrend(series.closes(), BANDPASS_DETREND_DEGREE);
    let anchor = select_anchor(&detrended, wavelength.bars(), align_to);
    let fallback = match anchor.confidence {
        AnchorConfidence::Unconfirmed => {
            let err = EngineError::NoConfirmedTurningPoint {
                wavelength: wavelength.bars(),
            };
            warn!(%err, index = anchor.index, "bandpass anchored to unconfirmed extremum");
            Some(err)
        }
        _ => None,
    };

    let omega = wavelength.omega();
    let anchor_phase = match anchor.kind {
        TurningKind::Peak => FRAC_PI_2,
        TurningKind::Trough => -FRAC_PI_2,
    };
    let phase_offset = anchor_phase - omega * anchor.index as f64;

    let total = n + projection_length;
    let samples: Vec<f64> = (0..total)
        .map(|t| (omega * t as f64 + phase_offset).sin())
        .collect();

    let peak_lattice = Lattice::new(&anchor, TurningKind::Peak, wavelength.bars());
    let trough_lattice = Lattice::new(&anchor, TurningKind::Trough, wavelength.bars());
    let (peaks, projected_peaks) = peak_lattice.labels(n, total);
    let (troughs, projected_troughs) = trough_lattice.labels(n, total);

    let last = (n - 1) as f64;
    let phase_degrees = (omega * last + phase_offset).to_degrees().rem_euclid(360.0);
    let amplitude = fitted_amplitude(&detrended, &samples[..n]);

    debug!(
        wavelength = wavelength.bars(),
        anchor = anchor.index,
        kind = %anchor.kind,
        confidence = ?anchor.confidence,
        "bandpass anchored"
    );

    Ok(BandpassResult {
        wavelength,
        history_len: n,
        phase_offset,
        anchor,
        peaks,
        troughs,
        projected_peaks,
        projected_troughs,
        next_peak: peak_lattice.next_after(n),
        next_trough: trough_lattice.next_after(n),
        phase_degrees,
        amplitude,
        samples,
        fallback,
    })
}

/// Pick the turning point the oscillator is locked to.
///
/// Recency wins over prominence: the most recent confirmed turning point of the requested kind
/// is used even when an older one is larger.
pub(crate) fn select_anchor(
    detrended: &[f64],
    wavelength: f64,
    align_to: TurningKind,
) -> TurningAnchor {
    let n = detrended.len();
    let search = ((SEARCH_CYCLES * wavelength).round() as usize).clamp(3.min(n), n);
    let offset = n - search;
    let recent = &detrended[offset..];

    let spread = recent.iter().population_std_dev();
    let min_prominence = if spread.is_finite() {
        PROMINENCE_STD_FRACTION * spread
    } else {
        0.0
    };
    let min_distance = ((MIN_SPACING_CYCLES * wavelength).floor() as usize).max(1);

    let latest_confirmed = |kind: TurningKind| {
        find_extrema(recent, kind, min_distance, min_prominence)
            .into_iter()
            .map(|e| (offset + e.index, e.value))
            .filter(|(idx, _)| is_confirmed(*idx, n, wavelength))
            .last()
    };

    if let Some((index, value)) = latest_confirmed(align_to) {
        return TurningAnchor {
            index,
            kind: align_to,
            confidence: AnchorConfidence::Confirmed,
            value,
        };
    }
    if let Some((index, value)) = latest_confirmed(align_to.opposite()) {
        return TurningAnchor {
            index,
            kind: align_to.opposite(),
            confidence: AnchorConfidence::Substituted,
            value,
        };
    }

    let cutoff = (CONFIRMATION_CYCLES * wavelength).ceil() as usize;
    let eligible = if recent.len() > cutoff {
        &recent[..recent.len() - cutoff]
    } else {
        recent
    };
    let extreme = eligible.iter().enumerate().max_by(|a, b| match align_to {
        TurningKind::Peak => a.1.total_cmp(b.1),
        TurningKind::Trough => b.1.total_cmp(a.1),
    });
    let (local, value) = extreme.map(|(i, v)| (i, *v)).unwrap_or((0, 0.0));

    TurningAnchor {
        index: offset + local,
        kind: align_to,
        confidence: AnchorConfidence::Unconfirmed,
        value,
    }
}

/// Positions `base + k * wavelength` of one kind of oscillator extremum.
struct Lattice {
    kind: TurningKind,
    base: f64,
    wavelength: f64,
}

impl Lattice {
    fn new(anchor: &TurningAnchor, kind: TurningKind, wavelength: f64) -> Self {
        let shift = if kind == anchor.kind {
            0.0
        } else {
            wavelength / 2.0
        };
        Self {
            kind,
            base: anchor.index as f64 + shift,
            wavelength,
        }
    }

    fn position(&self, k: i64) -> f64 {
        self.base + k as f64 * self.wavelength
    }

    fn label(&self, k: i64, history_len: usize) -> TurningLabel {
        let position = self.position(k);
        TurningLabel {
            kind: self.kind,
            position,
            index: position.round() as usize,
            projected: position > (history_len - 1) as f64,
        }
    }

    /// Confirmed historical labels and projected labels inside `total` bars.
    fn labels(&self, history_len: usize, total: usize) -> (Vec<TurningLabel>, Vec<TurningLabel>) {
        let last = (history_len - 1) as f64;
        let k_min = (-self.base / self.wavelength).ceil() as i64;
        let k_max = (((total - 1) as f64 - self.base) / self.wavelength).floor() as i64;

        let mut historical = Vec::new();
        let mut projected = Vec::new();
        for k in k_min..=k_max {
            let position = self.position(k);
            if position < 0.0 {
                continue;
            }
            if position > last {
                projected.push(self.label(k, history_len));
            } else if last - position >= CONFIRMATION_CYCLES * self.wavelength {
                historical.push(self.label(k, history_len));
            }
        }
        (historical, projected)
    }

    fn next_after(&self, history_len: usize) -> TurningLabel {
        let last = (history_len - 1) as f64;
        let mut k = ((last - self.base) / self.wavelength).floor() as i64 + 1;
        while self.position(k) <= last {
            k += 1;
        }
        self.label(k, history_len)
    }
}

fn fitted_amplitude(detrended: &[f64], oscillator: &[f64]) -> f64 {
    let energy: f64 = oscillator.iter().map(|s| s * s).sum();
    if energy <= f64::EPSILON {
        return 0.0;
    }
    let projection: f64 = detrended.iter().zip(oscillator).map(|(d, s)| d * s).sum();
    (projection / energy).abs()
}
