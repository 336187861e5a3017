//! Gaussian-enveloped complex kernels shared by the spectrum scan and the quality analyzer.

use std::f64::consts::PI;
use std::fmt::Debug;

use num_complex::Complex64;

/// Strategy choosing the envelope quality factor `Q` for a wavelength.
///
/// The envelope standard deviation is `Q * wavelength / (2 * pi)` bars, so `Q` is roughly the
/// number of radians of carrier under one sigma of envelope. Larger `Q` sharpens frequency
/// resolution and smears timing.
pub trait QualityFactor: Debug + Send + Sync {
    fn quality(&self, wavelength: f64) -> f64;
}

/// Default strategy: `Q` grows linearly with wavelength up to a cap, so long periods keep a
/// shorter envelope (relative to their length) and stay localized in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearCappedQuality {
    pub base: f64,
    pub per_bar: f64,
    pub cap: f64,
}

impl Default for LinearCappedQuality {
    fn default() -> Self {
        Self {
            base: 4.0,
            per_bar: 0.05,
            cap: 15.0,
        }
    }
}

impl QualityFactor for LinearCappedQuality {
    fn quality(&self, wavelength: f64) -> f64 {
        (self.base + self.per_bar * wavelength).min(self.cap).max(f64::EPSILON)
    }
}

/// Fixed `Q` for every wavelength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantQuality(pub f64);

impl QualityFactor for ConstantQuality {
    fn quality(&self, _wavelength: f64) -> f64 {
        self.0.max(f64::EPSILON)
    }
}

/// Sampled complex kernel tuned to one wavelength.
///
/// Taps are divided by the envelope sum, so a sine of amplitude `A` at the tuned wavelength
/// produces a response of magnitude `A / 2` whatever the kernel length.
#[derive(Debug, Clone)]
pub struct CycleKernel {
    taps: Vec<Complex64>,
}

impl CycleKernel {
    pub fn new(wavelength: f64, support: usize, quality: &dyn QualityFactor) -> Self {
        let freq = 1.0 / wavelength;
        let sigma = quality.quality(wavelength) * wavelength / (2.0 * PI);
        let half = support as f64 / 2.0;

        let mut taps: Vec<Complex64> = (0..support)
            .map(|i| {
                let t = i as f64 - half;
                let envelope = (-t * t / (2.0 * sigma * sigma)).exp();
                Complex64::from_polar(envelope, 2.0 * PI * freq * t)
            })
            .collect();

        let envelope_sum: f64 = taps.iter().map(|c| c.norm()).sum();
        if envelope_sum > 0.0 {
            for tap in &mut taps {
                *tap /= envelope_sum;
            }
        }
        Self { taps }
    }

    /// Kernel length for the spectrum scan: 4 to 8 cycles, never longer than the data.
    pub fn scan_support(wavelength: f64, len: usize) -> usize {
        let cycles = ((len as f64 / wavelength).floor() as usize).clamp(4, 8);
        ((wavelength * cycles as f64).round() as usize).clamp(1, len.max(1))
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Correlation of the kernel with `data[start..start + len]`.
    pub fn response_at(&self, data: &[f64], start: usize) -> Complex64 {
        data[start..start + self.taps.len()]
            .iter()
            .zip(&self.taps)
            .fold(Complex64::new(0.0, 0.0), |acc, (x, tap)| acc + tap.conj() * *x)
    }

    /// Band-limited reconstruction of the data around the tuned wavelength.
    ///
    /// Element `k` corresponds to the kernel centred on sample `k + len / 2`; only positions
    /// where the kernel fits entirely inside the data are produced.
    pub fn component(&self, data: &[f64]) -> Vec<f64> {
        if self.taps.is_empty() || data.len() < self.taps.len() {
            return Vec::new();
        }
        (0..=data.len() - self.taps.len())
            .map(|start| 2.0 * self.response_at(data, start).re)
            .collect()
    }
}
