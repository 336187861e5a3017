//! Market cycle detection: wavelet power spectra, rolling heatmaps, phase-locked bandpass
//! oscillators and cycle quality scoring over daily closing prices.
//!
//! Every period is measured in trading bars; calendar days appear only through
//! [`Wavelength::to_calendar_days`].

pub mod analysis;
pub mod data;
pub mod error;
pub mod options;
pub mod pipeline;

pub use analysis::{
    compute_bandpass, compute_heatmap, compute_spectrum, score_cycle, score_cycles,
    select_peaks, BandpassResult, CycleQualityScore, Heatmap, PowerSpectrum, SpectralPeak,
};
pub use data::{PricePoint, PriceSeries, TurningKind, Wavelength, WavelengthGrid};
pub use error::{EngineError, Result};
pub use options::{EngineOptions, HighPassOptions, SpectrumOptions};
pub use pipeline::{analyze, CycleReport};
