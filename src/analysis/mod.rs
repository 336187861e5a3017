pub mod bandpass;
pub mod detrend;
pub mod harmonics;
pub mod health;
pub mod heatmap;
pub mod kernel;
pub mod peaks;
pub mod quality;
pub mod significance;
pub mod spectrum;
pub mod stats;
pub mod swings;

pub use bandpass::{
    compute_bandpass, AnchorConfidence, BandpassResult, TurningAnchor, TurningLabel,
};
pub use harmonics::{harmonic_families, HarmonicFamily};
pub use health::{cycle_health, CycleHealth, HealthStatus};
pub use heatmap::{compute_heatmap, compute_heatmap_with, Heatmap, HeatmapSchedule};
pub use kernel::{ConstantQuality, CycleKernel, LinearCappedQuality, QualityFactor};
pub use peaks::{select_peaks, SpectralPeak};
pub use quality::{score_cycle, score_cycles, score_peaks, CycleQualityScore, QualityClass};
pub use significance::{bartels_score, BartelsScore};
pub use spectrum::{compute_spectrum, PowerSpectrum};
pub use swings::detect_swings;
