use std::sync::Arc;

use anyhow::{ensure, Result};
use clap::{Parser, ValueEnum};

use cycle_scanner::analysis::kernel::{ConstantQuality, LinearCappedQuality, QualityFactor};
use cycle_scanner::{EngineOptions, HighPassOptions, SpectrumOptions, TurningKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlignArg {
    Peak,
    Trough,
}

impl From<AlignArg> for TurningKind {
    fn from(value: AlignArg) -> Self {
        match value {
            AlignArg::Peak => TurningKind::Peak,
            AlignArg::Trough => TurningKind::Trough,
        }
    }
}

/// Command-line configuration for the cycle scanner.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct AppConfig {
    /// Input CSV file with `date,close` or `date,open,high,low,close[,volume]` rows.
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    pub input_path: String,

    /// Shortest candidate wavelength (trading bars).
    #[arg(long, default_value_t = 20.0)]
    pub min_wavelength: f64,

    /// Longest candidate wavelength (trading bars).
    #[arg(long, default_value_t = 400.0)]
    pub max_wavelength: f64,

    /// Wavelength grid step (trading bars).
    #[arg(long, default_value_t = 1.0)]
    pub wavelength_step: f64,

    /// Bars per analysis window.
    #[arg(long, default_value_t = 2000)]
    pub window_size: usize,

    /// Weekly offsets covered by the heatmap; 0 disables it.
    #[arg(long, default_value_t = 104)]
    pub heatmap_weeks: usize,

    /// Stride between heatmap weeks.
    #[arg(long, default_value_t = 1)]
    pub week_step: usize,

    /// Bars per heatmap week.
    #[arg(long, default_value_t = 5)]
    pub bars_per_week: usize,

    /// Turning point kind the bandpass oscillator is anchored to.
    #[arg(long, value_enum, default_value_t = AlignArg::Trough)]
    pub align_to: AlignArg,

    /// Bars of oscillator projected past the last close.
    #[arg(long, default_value_t = 250)]
    pub projection_length: usize,

    /// Minimum normalized power for a reported peak.
    #[arg(long, default_value_t = 0.15)]
    pub min_peak_height: f64,

    /// Minimum spacing between reported peaks, in grid steps.
    #[arg(long, default_value_t = 5)]
    pub min_peak_spacing: usize,

    /// Maximum number of peaks to report.
    #[arg(long, default_value_t = 8)]
    pub top_peaks: usize,

    /// Polynomial degree removed from log prices before scanning.
    #[arg(long, default_value_t = 1)]
    pub detrend_degree: usize,

    /// Suppress cycles longer than this many bars with a moving-average high-pass.
    #[arg(long, value_name = "BARS")]
    pub high_pass: Option<usize>,

    /// Gain applied to spectral power above the mean (1 to 4).
    #[arg(long, default_value_t = 2.0)]
    pub enhancement: f64,

    /// Use a constant wavelet quality factor instead of the wavelength-scaled default.
    #[arg(long, value_name = "Q")]
    pub constant_q: Option<f64>,

    /// Heatmap strength counted towards a cycle's persistence.
    #[arg(long, default_value_t = 0.5)]
    pub persistence_threshold: f64,
}

impl AppConfig {
    pub fn engine_options(&self) -> Result<EngineOptions> {
        ensure!(
            self.persistence_threshold.is_finite() && self.persistence_threshold >= 0.0,
            "persistence threshold must be a non-negative number"
        );

        let quality: Arc<dyn QualityFactor> = match self.constant_q {
            Some(q) => {
                ensure!(q.is_finite() && q > 0.0, "constant Q must be positive");
                Arc::new(ConstantQuality(q))
            }
            None => Arc::new(LinearCappedQuality::default()),
        };

        let high_pass = self.high_pass.map(|max_period| HighPassOptions {
            max_period,
            ..HighPassOptions::default()
        });

        let options = EngineOptions {
            min_wavelength: self.min_wavelength,
            max_wavelength: self.max_wavelength,
            wavelength_step: self.wavelength_step,
            window_size: self.window_size,
            heatmap_weeks: self.heatmap_weeks,
            bars_per_week: self.bars_per_week,
            week_step: self.week_step,
            align_to: self.align_to.into(),
            projection_length: self.projection_length,
            min_peak_height: self.min_peak_height,
            min_peak_spacing: self.min_peak_spacing,
            top_peaks: self.top_peaks,
            spectrum: SpectrumOptions {
                detrend_degree: self.detrend_degree,
                high_pass,
                enhancement_factor: self.enhancement,
                quality,
                ..SpectrumOptions::default()
            },
        };
        options.validate()?;
        Ok(options)
    }
}
