use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{EngineError, Result};

/// Calendar days per trading bar for a US equity calendar (365.25 / 252), used only when a
/// series is too short to measure its own ratio.
pub const DEFAULT_CALENDAR_DAYS_PER_BAR: f64 = 365.25 / 252.0;

/// Shortest period daily bars can resolve.
pub const MIN_WAVELENGTH_BARS: f64 = 2.0;

/// Upper bound on the number of candidate wavelengths in one grid.
pub const MAX_GRID_POINTS: usize = 100_000;

/// Single daily observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Chronological closing prices with strictly ascending, duplicate-free dates.
///
/// Gaps from non-trading days are expected; the engine works in bar units and only looks at
/// dates when converting a period to calendar days.
#[derive(Debug, Clone, Serialize)]
pub struct PriceSeries {
    dates: Vec<NaiveDate>,
    closes: Vec<f64>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(EngineError::InvalidSeries("series is empty".to_string()));
        }

        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(EngineError::InvalidSeries(format!(
                    "dates must be strictly increasing ({} followed by {})",
                    pair[0].date, pair[1].date
                )));
            }
        }
        if let Some(bad) = points.iter().find(|p| !p.close.is_finite()) {
            return Err(EngineError::InvalidSeries(format!(
                "non-finite price on {}",
                bad.date
            )));
        }

        let (dates, closes) = points.into_iter().map(|p| (p.date, p.close)).unzip();
        Ok(Self { dates, closes })
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Average calendar days covered by one bar across the whole series.
    pub fn calendar_days_per_bar(&self) -> f64 {
        match (self.dates.first(), self.dates.last()) {
            (Some(first), Some(last)) if self.dates.len() > 1 => {
                let span = (*last - *first).num_days() as f64;
                span / (self.dates.len() - 1) as f64
            }
            _ => DEFAULT_CALENDAR_DAYS_PER_BAR,
        }
    }
}

/// Candidate cycle period, always measured in trading bars.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct Wavelength(f64);

impl Wavelength {
    pub fn new(bars: f64) -> Result<Self> {
        if !bars.is_finite() {
            return Err(EngineError::InvalidWavelength {
                wavelength: bars,
                reason: "must be finite",
            });
        }
        if bars <= 0.0 {
            return Err(EngineError::InvalidWavelength {
                wavelength: bars,
                reason: "must be positive",
            });
        }
        if bars < MIN_WAVELENGTH_BARS {
            return Err(EngineError::InvalidWavelength {
                wavelength: bars,
                reason: "must be at least two bars",
            });
        }
        Ok(Self(bars))
    }

    pub fn bars(self) -> f64 {
        self.0
    }

    pub fn omega(self) -> f64 {
        2.0 * std::f64::consts::PI / self.0
    }

    /// The only place a trading-bar period becomes a calendar period.
    pub fn to_calendar_days(self, calendar_days_per_bar: f64) -> f64 {
        self.0 * calendar_days_per_bar
    }
}

impl fmt::Display for Wavelength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}b", self.0)
    }
}

/// Ordered candidate wavelengths `min..=max` in steps of `step` bars.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WavelengthGrid {
    wavelengths: Vec<Wavelength>,
    step: f64,
}

impl WavelengthGrid {
    pub fn new(min: f64, max: f64, step: f64) -> Result<Self> {
        Wavelength::new(min)?;
        Wavelength::new(max)?;
        if !(step.is_finite() && step > 0.0) {
            return Err(EngineError::InvalidOptions(format!(
                "wavelength step must be positive, got {step}"
            )));
        }
        if max < min {
            return Err(EngineError::InvalidOptions(format!(
                "maximum wavelength {max} is below minimum {min}"
            )));
        }

        let span = ((max - min) / step + 1e-9).floor();
        if span >= MAX_GRID_POINTS as f64 {
            return Err(EngineError::InvalidOptions(format!(
                "wavelength grid {min}..={max} step {step} exceeds {MAX_GRID_POINTS} points"
            )));
        }
        let count = span as usize + 1;
        let wavelengths = (0..count)
            .map(|i| Wavelength(min + step * i as f64))
            .collect();
        Ok(Self { wavelengths, step })
    }

    pub fn len(&self) -> usize {
        self.wavelengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelengths.is_empty()
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn wavelengths(&self) -> &[Wavelength] {
        &self.wavelengths
    }

    pub fn get(&self, idx: usize) -> Option<Wavelength> {
        self.wavelengths.get(idx).copied()
    }

    /// Grid position of `wavelength`, if it is one of the grid's values.
    pub fn index_of(&self, wavelength: Wavelength) -> Option<usize> {
        let tolerance = self.step * 1e-6;
        self.wavelengths
            .iter()
            .position(|w| (w.0 - wavelength.0).abs() <= tolerance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TurningKind {
    Peak,
    Trough,
}

impl TurningKind {
    pub fn opposite(self) -> Self {
        match self {
            TurningKind::Peak => TurningKind::Trough,
            TurningKind::Trough => TurningKind::Peak,
        }
    }
}

impl fmt::Display for TurningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurningKind::Peak => write!(f, "peak"),
            TurningKind::Trough => write!(f, "trough"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn business_days(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
        use chrono::{Datelike, Weekday};
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

    #[test]
    fn rejects_non_monotonic_dates() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let points = vec![
            PricePoint { date: d, close: 1.0 },
            PricePoint { date: d, close: 2.0 },
        ];
        assert!(matches!(
            PriceSeries::new(points),
            Err(EngineError::InvalidSeries(_))
        ));
    }

    #[test]
    fn rejects_non_positive_wavelength() {
        assert!(Wavelength::new(0.0).is_err());
        assert!(Wavelength::new(-3.0).is_err());
        assert!(Wavelength::new(f64::NAN).is_err());
        assert!(Wavelength::new(20.0).is_ok());
    }

    #[test]
    fn calendar_conversion_uses_series_ratio() {
        // Fixture: Mon 2024-01-01 .. five business-day weeks => 7 calendar days per 5 bars.
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = business_days(start, 26);
        let points = dates
            .into_iter()
            .map(|date| PricePoint { date, close: 10.0 })
            .collect();
        let series = PriceSeries::new(points).unwrap();
        let ratio = series.calendar_days_per_bar();
        assert!((ratio - 35.0 / 25.0).abs() < 1e-12);

        let wavelength = Wavelength::new(50.0).unwrap();
        assert!((wavelength.to_calendar_days(ratio) - 70.0).abs() < 1e-9);
    }

    #[test]
    fn calendar_conversion_default_ratio() {
        let wavelength = Wavelength::new(252.0).unwrap();
        let days = wavelength.to_calendar_days(DEFAULT_CALENDAR_DAYS_PER_BAR);
        assert!((days - 365.25).abs() < 1e-9);
    }

    #[test]
    fn grid_includes_both_ends() {
        let grid = WavelengthGrid::new(20.0, 120.0, 5.0).unwrap();
        assert_eq!(grid.len(), 21);
        assert_eq!(grid.get(0).unwrap().bars(), 20.0);
        assert_eq!(grid.get(20).unwrap().bars(), 120.0);
        assert_eq!(grid.index_of(Wavelength::new(50.0).unwrap()), Some(6));
        assert_eq!(grid.index_of(Wavelength::new(52.0).unwrap()), None);
    }

    #[test]
    fn sub_nyquist_wavelengths_are_rejected() {
        assert!(Wavelength::new(2.0).is_ok());
        for bars in [1.999, 0.001, 1e-9] {
            assert!(matches!(
                Wavelength::new(bars),
                Err(EngineError::InvalidWavelength { .. })
            ));
        }
        assert!(matches!(
            WavelengthGrid::new(1.0, 10.0, 1.0),
            Err(EngineError::InvalidWavelength { .. })
        ));
    }

    #[test]
    fn oversized_grid_is_rejected() {
        assert!(matches!(
            WavelengthGrid::new(20.0, 400.0, 1e-9),
            Err(EngineError::InvalidOptions(_))
        ));
        let grid = WavelengthGrid::new(2.0, 100_001.0, 1.0).unwrap();
        assert_eq!(grid.len(), MAX_GRID_POINTS);
        assert!(WavelengthGrid::new(2.0, 100_002.0, 1.0).is_err());
    }
}
