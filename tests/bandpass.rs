mod common;

use std::f64::consts::PI;

use common::{series_from, sine_series, wavelength};
use cycle_scanner::analysis::bandpass::{is_confirmed, CONFIRMATION_CYCLES};
use cycle_scanner::analysis::{AnchorConfidence, BandpassResult, TurningLabel};
use cycle_scanner::{compute_bandpass, EngineError, TurningKind, Wavelength};

fn distance_to_lattice(position: f64, offset: f64, period: f64) -> f64 {
    let r = (position - offset).rem_euclid(period);
    r.min(period - r)
}

fn all_labels(result: &BandpassResult) -> impl Iterator<Item = &TurningLabel> {
    result
        .peaks
        .iter()
        .chain(&result.troughs)
        .chain(&result.projected_peaks)
        .chain(&result.projected_troughs)
}

#[test]
fn fifty_bar_cycle_locks_onto_synthetic_extrema() {
    let series = sine_series(2000, 50.0);
    let result = compute_bandpass(&series, wavelength(50.0), TurningKind::Trough, 250).unwrap();

    assert_eq!(result.anchor.kind, TurningKind::Trough);
    assert_eq!(result.anchor.confidence, AnchorConfidence::Confirmed);
    assert!(result.fallback.is_none());
    assert!(!result.is_low_confidence());
    // Synthetic troughs sit at 37.5 + 50k; the last one (1987.5) is still developing.
    assert!((1936..=1939).contains(&result.anchor.index));

    assert_eq!(result.samples.len(), 2250);
    assert_eq!(result.projection().len(), 250);
    assert!(result.peaks.len() > 30);
    for label in &result.peaks {
        assert!(distance_to_lattice(label.position, 12.5, 50.0) <= 2.0);
    }
    for label in &result.troughs {
        assert!(distance_to_lattice(label.position, 37.5, 50.0) <= 2.0);
    }
    assert!(result.amplitude > 5.0 && result.amplitude < 15.0);
}

#[test]
fn derived_labels_are_exactly_one_wavelength_apart() {
    for bars in [50.0, 45.0, 37.0] {
        let series = sine_series(1500, bars);
        let result = compute_bandpass(&series, wavelength(bars), TurningKind::Peak, 200).unwrap();

        for labels in [&result.peaks, &result.troughs] {
            for pair in labels.windows(2) {
                assert_eq!(pair[1].position - pair[0].position, bars);
            }
        }
        for label in all_labels(&result) {
            let expected = match label.kind {
                TurningKind::Peak => 1.0,
                TurningKind::Trough => -1.0,
            };
            assert!((result.value_at(label.position) - expected).abs() < 1e-9);
            let sampled = result.samples[label.index];
            assert!(sampled.abs() <= 1.0 && sampled * expected > 0.99);
        }
    }
}

#[test]
fn integer_label_indices_hit_the_samples() {
    let series = sine_series(1200, 40.0);
    let result = compute_bandpass(&series, wavelength(40.0), TurningKind::Trough, 100).unwrap();
    for label in result.peaks.iter().chain(&result.projected_peaks) {
        assert!((result.samples[label.index] - 1.0).abs() < 1e-9);
    }
    for label in result.troughs.iter().chain(&result.projected_troughs) {
        assert!((result.samples[label.index] + 1.0).abs() < 1e-9);
    }
    assert!((result.value_at(result.anchor.index as f64) + 1.0).abs() < 1e-12);
}

#[test]
fn no_historical_label_near_the_end() {
    let series = sine_series(1000, 60.0);
    for align in [TurningKind::Peak, TurningKind::Trough] {
        let result = compute_bandpass(&series, wavelength(60.0), align, 120).unwrap();
        let last = (series.len() - 1) as f64;
        for label in result.peaks.iter().chain(&result.troughs) {
            assert!(!label.projected);
            assert!(last - label.position >= CONFIRMATION_CYCLES * 60.0);
        }
        for label in result.projected_peaks.iter().chain(&result.projected_troughs) {
            assert!(label.projected);
            assert!(label.position > last);
        }
        assert!(result.next_peak.position > last);
        assert!(result.next_trough.position > last);
        assert!(result.next_peak.position - last <= 60.0);
        assert!((0.0..360.0).contains(&result.phase_degrees));
    }
}

#[test]
fn trough_five_bars_from_the_end_is_never_the_anchor() {
    // Troughs at 894, 944 and 994 of 1000 bars; 994 is five bars from the end.
    let closes: Vec<f64> = (0..1000)
        .map(|t| 100.0 - 10.0 * (2.0 * PI * (t as f64 - 994.0) / 50.0).cos())
        .collect();
    let series = series_from(&closes);
    let result = compute_bandpass(&series, wavelength(50.0), TurningKind::Trough, 50).unwrap();

    assert_ne!(result.anchor.index, 994);
    assert_eq!(result.anchor.index, 944);
    assert_eq!(result.anchor.confidence, AnchorConfidence::Confirmed);
    assert!(result.fallback.is_none());
    assert_eq!(result.troughs.last().map(|l| l.index), Some(944));
    assert_eq!(result.next_trough.index, 1044);
    assert!(result.next_trough.projected);
}

#[test]
fn lone_developing_trough_falls_back_to_unconfirmed_anchor() {
    // Straight rise with a single dip five bars from the end: no confirmed turning point.
    let mut closes: Vec<f64> = (0..600).map(|t| 100.0 + 0.1 * t as f64).collect();
    closes[594] -= 5.0;
    let series = series_from(&closes);
    let result = compute_bandpass(&series, wavelength(50.0), TurningKind::Trough, 50).unwrap();

    assert_ne!(result.anchor.index, 594);
    assert!(is_confirmed(result.anchor.index, series.len(), 50.0));
    assert_eq!(result.anchor.kind, TurningKind::Trough);
    assert_eq!(result.anchor.confidence, AnchorConfidence::Unconfirmed);
    assert!(result.is_low_confidence());
    assert!(matches!(
        result.fallback,
        Some(EngineError::NoConfirmedTurningPoint { .. })
    ));
    for label in result.troughs.iter() {
        assert!(!label.projected);
        assert!(is_confirmed(label.index, series.len(), 50.0));
    }
    assert!(result.next_trough.projected);
}

#[test]
fn rejects_bad_wavelengths_and_short_history() {
    for bars in [0.0, 0.001, 1.5] {
        assert!(matches!(
            Wavelength::new(bars),
            Err(EngineError::InvalidWavelength { .. })
        ));
    }

    let series = sine_series(100, 50.0);
    let err = compute_bandpass(&series, wavelength(60.0), TurningKind::Peak, 10).unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientData {
            required: 120,
            available: 100
        }
    );
}
