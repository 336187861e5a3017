#![allow(dead_code)]

use std::f64::consts::PI;

use chrono::{Datelike, NaiveDate, Weekday};
use cycle_scanner::{PricePoint, PriceSeries, Wavelength, WavelengthGrid};

/// Weekday-only dates starting at `start`.
pub fn business_days(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(count);
    let mut day = start;
    while dates.len() < count {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(day);
        }
        day = day.succ_opt().unwrap();
    }
    dates
}

pub fn series_from(closes: &[f64]) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2015, 1, 5).unwrap();
    let points = business_days(start, closes.len())
        .into_iter()
        .zip(closes)
        .map(|(date, &close)| PricePoint { date, close })
        .collect();
    PriceSeries::new(points).unwrap()
}

/// `mean + amplitude * sin(2 pi t / wavelength)` for `t in 0..len`.
pub fn sine_closes(len: usize, wavelength: f64, mean: f64, amplitude: f64) -> Vec<f64> {
    (0..len)
        .map(|t| mean + amplitude * (2.0 * PI * t as f64 / wavelength).sin())
        .collect()
}

pub fn sine_series(len: usize, wavelength: f64) -> PriceSeries {
    series_from(&sine_closes(len, wavelength, 100.0, 10.0))
}

pub fn grid(min: f64, max: f64, step: f64) -> WavelengthGrid {
    WavelengthGrid::new(min, max, step).unwrap()
}

pub fn wavelength(bars: f64) -> Wavelength {
    Wavelength::new(bars).unwrap()
}
