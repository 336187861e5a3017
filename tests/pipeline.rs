mod common;

use std::f64::consts::PI;

use common::{series_from, sine_series};
use cycle_scanner::{analyze, EngineError, EngineOptions, TurningKind};

fn options() -> EngineOptions {
    EngineOptions {
        min_wavelength: 20.0,
        max_wavelength: 120.0,
        wavelength_step: 1.0,
        window_size: 1000,
        heatmap_weeks: 20,
        top_peaks: 5,
        projection_length: 100,
        ..EngineOptions::default()
    }
}

#[test]
fn analyze_produces_a_consistent_report() {
    let series = sine_series(2000, 50.0);
    let report = analyze(&series, &options()).unwrap();

    assert_eq!(report.bars, 2000);
    assert_eq!(report.dominant().map(|p| p.wavelength.bars()), Some(50.0));
    assert_eq!(report.quality.len(), report.peaks.len());
    for (peak, quality) in report.peaks.iter().zip(&report.quality) {
        assert_eq!(peak.wavelength, quality.wavelength);
    }

    let heatmap = report.heatmap.as_ref().unwrap();
    assert_eq!(heatmap.live.raw, report.spectrum.raw);
    assert_eq!(heatmap.column(0), report.spectrum.power);
    assert_eq!(heatmap.max_value(), 1.0);

    let dominant = &report.bandpass[0];
    assert_eq!(dominant.wavelength.bars(), 50.0);
    assert_eq!(dominant.anchor.kind, TurningKind::Trough);
    assert_eq!(dominant.samples.len(), 2100);
}

#[test]
fn fading_cycle_reports_one_live_spectrum() {
    // Older windows carry more power than the live one.
    let closes: Vec<f64> = (0..1500)
        .map(|t| {
            let t = t as f64;
            100.0 + 20.0 * (1.0 - t / 1500.0) * (2.0 * PI * t / 50.0).sin()
        })
        .collect();
    let series = series_from(&closes);
    let options = EngineOptions {
        window_size: 800,
        heatmap_weeks: 100,
        ..options()
    };
    let report = analyze(&series, &options).unwrap();
    let heatmap = report.heatmap.as_ref().unwrap();

    assert_eq!(heatmap.column(0), report.spectrum.power);
    assert_eq!(heatmap.normalization, report.spectrum.normalization);
    let live_max = report.spectrum.power.iter().copied().fold(0.0, f64::max);
    assert!(live_max < 1.0, "{live_max}");
    assert_eq!(heatmap.max_value(), 1.0);

    assert_eq!(report.dominant().map(|p| p.wavelength.bars()), Some(50.0));
    for peak in &report.peaks {
        assert_eq!(peak.power, report.spectrum.power[peak.grid_index]);
    }
    for (peak, quality) in report.peaks.iter().zip(&report.quality) {
        assert_eq!(peak.power, quality.power);
    }
}

#[test]
fn short_history_skips_the_heatmap_only() {
    let series = sine_series(1200, 50.0);
    let options = EngineOptions {
        heatmap_weeks: 200,
        ..options()
    };
    let report = analyze(&series, &options).unwrap();
    assert!(report.heatmap.is_none());
    assert!(!report.peaks.is_empty());
}

#[test]
fn invalid_options_are_rejected_up_front() {
    let series = sine_series(1200, 50.0);
    let options = EngineOptions {
        wavelength_step: 0.0,
        ..options()
    };
    assert!(matches!(
        analyze(&series, &options),
        Err(EngineError::InvalidOptions(_))
    ));
}
