use chrono::{Datelike, Duration, NaiveDate, Weekday};
use itertools::Itertools;
use tabled::{settings::Style, Table, Tabled};

use cycle_scanner::analysis::{AnchorConfidence, BandpassResult, TurningLabel};
use cycle_scanner::{CycleReport, PriceSeries};

#[derive(Tabled)]
struct CycleRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Bars")]
    bars: String,
    #[tabled(rename = "Days")]
    days: String,
    #[tabled(rename = "Power")]
    power: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Stars")]
    stars: String,
    #[tabled(rename = "SNR")]
    snr: String,
    #[tabled(rename = "Family")]
    family: String,
    #[tabled(rename = "Bartels")]
    bartels: String,
    #[tabled(rename = "Health")]
    health: String,
    #[tabled(rename = "Persist")]
    persistence: String,
}

#[derive(Tabled)]
struct BandpassRow {
    #[tabled(rename = "Bars")]
    bars: String,
    #[tabled(rename = "Anchor")]
    anchor: String,
    #[tabled(rename = "Confidence")]
    confidence: &'static str,
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "Amplitude")]
    amplitude: String,
    #[tabled(rename = "Next Peak")]
    next_peak: String,
    #[tabled(rename = "Next Trough")]
    next_trough: String,
}

pub fn print_report(report: &CycleReport, series: &PriceSeries, persistence_threshold: f64) {
    println!("\n=== Cycle Scan ===\n");
    if let (Some(first), Some(last)) = (series.dates().first(), series.last_date()) {
        println!(
            "Bars: {} spanning {} to {} ({:.3} calendar days per bar)",
            report.bars,
            first,
            last,
            series.calendar_days_per_bar()
        );
    }
    println!(
        "Spectrum: {} wavelengths, window {} bars, normalization {:.6}",
        report.spectrum.len(),
        report.spectrum.window_size,
        report.spectrum.normalization
    );
    match &report.heatmap {
        Some(heatmap) => println!(
            "Heatmap: {} columns x {} wavelengths, global max {:.6}",
            heatmap.columns(),
            heatmap.wavelengths.len(),
            heatmap.normalization
        ),
        None => println!("Heatmap: not computed"),
    }

    if report.peaks.is_empty() {
        println!("No dominant cycles above the configured threshold.");
        return;
    }

    let rows: Vec<CycleRow> = report
        .peaks
        .iter()
        .zip(&report.quality)
        .enumerate()
        .map(|(rank, (peak, quality))| {
            let family = if quality.orphan {
                "orphan".to_string()
            } else {
                quality
                    .family
                    .members
                    .iter()
                    .map(|w| format!("{:.0}", w.bars()))
                    .join("/")
            };
            let persistence = report
                .heatmap
                .as_ref()
                .and_then(|heatmap| {
                    heatmap
                        .wavelengths
                        .iter()
                        .position(|w| *w == peak.wavelength)
                        .map(|idx| heatmap.persistence(idx, persistence_threshold))
                })
                .map(|p| format!("{:.0}%", p * 100.0))
                .unwrap_or_else(|| "-".to_string());
            CycleRow {
                rank: rank + 1,
                bars: format!("{:.1}", peak.wavelength.bars()),
                days: format!("{:.1}", peak.calendar_days),
                power: format!("{:.3}", peak.power),
                class: quality.class.to_string(),
                score: format!("{:.1}", quality.score),
                stars: "*".repeat(quality.stars as usize),
                snr: format!("{:.1}", quality.metrics.snr),
                family,
                bartels: format!("{:.0} {}", quality.bartels.score, quality.bartels.rating),
                health: format!("{:.0} {:?}", quality.health.score, quality.health.status),
                persistence,
            }
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("\n{table}\n");

    if report.bandpass.is_empty() {
        return;
    }

    let rows: Vec<BandpassRow> = report
        .bandpass
        .iter()
        .map(|bandpass| bandpass_row(bandpass, series))
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}\n");
}

fn bandpass_row(bandpass: &BandpassResult, series: &PriceSeries) -> BandpassRow {
    let anchor_date = series
        .dates()
        .get(bandpass.anchor.index)
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());
    let confidence = match bandpass.anchor.confidence {
        AnchorConfidence::Confirmed => "confirmed",
        AnchorConfidence::Substituted => "substituted",
        AnchorConfidence::Unconfirmed => "LOW",
    };
    BandpassRow {
        bars: format!("{:.1}", bandpass.wavelength.bars()),
        anchor: format!("{} {}", bandpass.anchor.kind, anchor_date),
        confidence,
        phase: format!("{:.0}°", bandpass.phase_degrees),
        amplitude: format!("{:.4}", bandpass.amplitude),
        next_peak: projected_date(&bandpass.next_peak, bandpass.history_len, series),
        next_trough: projected_date(&bandpass.next_trough, bandpass.history_len, series),
    }
}

/// Estimated date of a projected label, stepping over weekends from the last close.
fn projected_date(label: &TurningLabel, history_len: usize, series: &PriceSeries) -> String {
    let ahead = label.index.saturating_sub(history_len - 1);
    match series.last_date() {
        Some(last) => format!("{} (+{ahead})", add_trading_days(last, ahead)),
        None => format!("+{ahead}"),
    }
}

fn add_trading_days(start: NaiveDate, bars: usize) -> NaiveDate {
    let mut date = start;
    let mut remaining = bars;
    while remaining > 0 {
        date += Duration::days(1);
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            remaining -= 1;
        }
    }
    date
}
