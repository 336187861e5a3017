use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use itertools::Itertools;
use thiserror::Error;

use cycle_scanner::data::PricePoint;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("input file contains no valid rows")]
    Empty,

    #[error("unable to parse date from record: {0:?}")]
    Date(StringRecord),

    #[error("failed to parse numeric field '{field}' from value '{value}'")]
    ParseNumber { field: &'static str, value: String },

    #[error("duplicate date {0} in input")]
    DuplicateDate(NaiveDate),
}

/// Daily closes from a CSV of `date,close` or `date,open,high,low,close[,volume]` rows.
pub fn load_prices_from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<PricePoint>> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref).with_context(|| format!("failed to open {:?}", path_ref))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    let mut points = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        if let Some(point) = parse_record(&record)? {
            points.push(point);
        }
    }

    if points.is_empty() {
        return Err(LoaderError::Empty.into());
    }

    points.sort_by_key(|point| point.date);
    if let Some((dup, _)) = points
        .iter()
        .tuple_windows()
        .find(|(a, b)| a.date == b.date)
    {
        return Err(LoaderError::DuplicateDate(dup.date).into());
    }
    Ok(points)
}

fn parse_record(record: &StringRecord) -> Result<Option<PricePoint>> {
    // Skip header rows by checking the first field.
    if let Some(first) = record.get(0) {
        let first = first.trim();
        if first.eq_ignore_ascii_case("date") || first.eq_ignore_ascii_case("timestamp") {
            return Ok(None);
        }
    }

    let fields: Vec<&str> = record
        .iter()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();
    let close_field = match fields.len() {
        2 => 1,
        5 | 6 => 4,
        _ => return Ok(None),
    };

    let date = parse_date(fields[0]).ok_or_else(|| LoaderError::Date(record.clone()))?;
    let close = parse_number(fields[close_field], "close")?;

    Ok(Some(PricePoint { date, close }))
}

fn parse_number(value: &str, field: &'static str) -> Result<f64> {
    value
        .replace(',', "")
        .parse::<f64>()
        .map_err(|_| LoaderError::ParseNumber {
            field,
            value: value.to_string(),
        })
        .map_err(anyhow::Error::from)
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let date_patterns = [
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%m/%d/%Y",
        "%-m/%-d/%Y",
        "%Y%m%d",
    ];
    for pattern in &date_patterns {
        if let Ok(date) = NaiveDate::parse_from_str(value, pattern) {
            return Some(date);
        }
    }

    let datetime_patterns = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
    ];
    datetime_patterns
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(value, pattern).ok())
        .map(|datetime| datetime.date())
}
