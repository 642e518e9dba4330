//! Time series data handling for forecasting
//!
//! The [`DataLoader`] turns a delimited text source into [`Observation`]s,
//! keeping unparsable rows as invalid observations instead of failing. The
//! [`Series`] type holds the cleaned, one-value-per-period sequence the rest of
//! the pipeline works on.

use crate::config::DataSourceConfig;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// A single raw reading. Either field may be missing when the source row
/// could not be parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Zero-based data row in the source (header excluded)
    pub row: usize,
    pub timestamp: Option<NaiveDateTime>,
    pub raw_value: Option<f64>,
}

impl Observation {
    /// Build a valid observation
    pub fn new(row: usize, timestamp: NaiveDateTime, value: f64) -> Self {
        Self {
            row,
            timestamp: Some(timestamp),
            raw_value: Some(value),
        }
    }

    /// Timestamp and value, when both parsed
    pub fn valid(&self) -> Option<(NaiveDateTime, f64)> {
        match (self.timestamp, self.raw_value) {
            (Some(ts), Some(value)) => Some((ts, value)),
            _ => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid().is_some()
    }
}

/// Observations read from one source
#[derive(Debug, Clone)]
pub struct LoadedObservations {
    pub observations: Vec<Observation>,
    /// Data rows seen in the source
    pub total_rows: usize,
    /// Rows whose timestamp or value did not parse
    pub invalid_rows: usize,
}

impl LoadedObservations {
    pub fn valid_rows(&self) -> usize {
        self.total_rows - self.invalid_rows
    }
}

/// Data loader for delimited observation files
#[derive(Debug, Clone)]
pub struct DataLoader {
    config: DataSourceConfig,
}

impl DataLoader {
    pub fn new(config: DataSourceConfig) -> Self {
        Self { config }
    }

    /// Load observations from a CSV file
    pub fn from_csv<P: AsRef<Path>>(&self, path: P) -> Result<LoadedObservations> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ForecastError::DataSource(format!(
                "No data source found at {}",
                path.display()
            )));
        }

        let file = File::open(path).map_err(|e| {
            ForecastError::DataSource(format!("Cannot open {}: {}", path.display(), e))
        })?;

        self.from_reader(file)
    }

    /// Load observations from any reader producing delimited text
    pub fn from_reader<R: Read>(&self, reader: R) -> Result<LoadedObservations> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(self.config.delimiter as u8)
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| ForecastError::DataSource(format!("Cannot read header: {}", e)))?
            .clone();

        let time_idx = Self::find_column(&headers, &self.config.timestamp_column)?;
        let value_idx = Self::find_column(&headers, &self.config.value_column)?;

        let mut observations = Vec::new();
        let mut invalid_rows = 0;

        for (row, record) in csv_reader.records().enumerate() {
            let record = record.map_err(|e| {
                ForecastError::DataSource(format!("Unreadable record {}: {}", row + 1, e))
            })?;

            let observation = Observation {
                row,
                timestamp: record.get(time_idx).and_then(parse_timestamp),
                raw_value: record
                    .get(value_idx)
                    .and_then(|v| parse_value(v, self.config.decimal_comma)),
            };

            if !observation.is_valid() {
                invalid_rows += 1;
            }
            observations.push(observation);
        }

        let total_rows = observations.len();
        if total_rows == invalid_rows {
            return Err(ForecastError::EmptyDataset(format!(
                "None of the {} rows has a valid '{}' and '{}'",
                total_rows, self.config.timestamp_column, self.config.value_column
            )));
        }

        Ok(LoadedObservations {
            observations,
            total_rows,
            invalid_rows,
        })
    }

    /// Locate a required column by exact (trimmed) header name
    fn find_column(headers: &StringRecord, name: &str) -> Result<usize> {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
            .ok_or_else(|| {
                ForecastError::DataSource(format!(
                    "Required column '{}' not found (columns: {})",
                    name,
                    headers.iter().collect::<Vec<_>>().join(", ")
                ))
            })
    }
}

/// Parse an ISO-like date or date-time. Returns `None` for anything else.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .map(|date| date.and_time(NaiveTime::default()))
        })
}

/// Parse a finite reading
pub fn parse_value(raw: &str, decimal_comma: bool) -> Option<f64> {
    let raw = raw.trim();
    let parsed = if decimal_comma {
        raw.replace(',', ".").parse::<f64>()
    } else {
        raw.parse::<f64>()
    };

    parsed.ok().filter(|v| v.is_finite())
}

/// Size of one period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Calendar day
    Day,
    /// Whatever resolution the timestamps already have
    Native,
}

impl Granularity {
    /// The period a timestamp belongs to
    pub fn period_of(&self, timestamp: NaiveDateTime) -> NaiveDateTime {
        match self {
            Granularity::Day => timestamp.date().and_time(NaiveTime::default()),
            Granularity::Native => timestamp,
        }
    }

    /// Render a period for output
    pub fn format(&self, period: NaiveDateTime) -> String {
        match self {
            Granularity::Day => period.format("%Y-%m-%d").to_string(),
            Granularity::Native => period.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// How several readings in one period collapse into one value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionPolicy {
    /// Earliest reading of the period
    FirstValid,
    /// Arithmetic mean of the period
    Mean,
}

/// One reduced period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub period: NaiveDateTime,
    pub value: f64,
}

/// Strictly time-ordered, one value per period, no zeros, no NaN/Inf
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    points: Vec<SeriesPoint>,
    granularity: Granularity,
}

impl Series {
    /// Build a series, checking every invariant
    pub fn new(points: Vec<SeriesPoint>, granularity: Granularity) -> Result<Self> {
        if points.is_empty() {
            return Err(ForecastError::EmptyDataset(
                "Series has no points".to_string(),
            ));
        }

        if let Some(pair) = points.windows(2).find(|w| w[0].period >= w[1].period) {
            return Err(ForecastError::InvalidParameter(format!(
                "Series periods must be strictly increasing ({} then {})",
                pair[0].period, pair[1].period
            )));
        }

        if let Some(point) = points
            .iter()
            .find(|p| p.value == 0.0 || !p.value.is_finite())
        {
            return Err(ForecastError::InvalidParameter(format!(
                "Series value {} at {} is zero or non-finite",
                point.value, point.period
            )));
        }

        Ok(Self {
            points,
            granularity,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn periods(&self) -> Vec<NaiveDateTime> {
        self.points.iter().map(|p| p.period).collect()
    }

    /// Periods rendered for output
    pub fn formatted_periods(&self) -> Vec<String> {
        self.points
            .iter()
            .map(|p| self.granularity.format(p.period))
            .collect()
    }

    pub fn last_period(&self) -> NaiveDateTime {
        self.points[self.points.len() - 1].period
    }

    /// Distance between consecutive periods used when extending the series:
    /// one day for daily data, otherwise the last observed spacing.
    pub fn step(&self) -> Duration {
        match self.granularity {
            Granularity::Day => Duration::days(1),
            Granularity::Native => match self.points.len() {
                0 | 1 => Duration::days(1),
                n => self.points[n - 1].period - self.points[n - 2].period,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: &str) -> NaiveDateTime {
        parse_timestamp(date).unwrap()
    }

    fn point(period: &str, value: f64) -> SeriesPoint {
        SeriesPoint {
            period: at(period),
            value,
        }
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 3, 1)
            .unwrap()
            .and_hms_opt(5, 0, 0)
            .unwrap();

        assert_eq!(parse_timestamp("2023-03-01T05:00:00.000"), Some(expected));
        assert_eq!(parse_timestamp("2023-03-01 05:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2023-03-01 05:00"), Some(expected));
        assert_eq!(parse_timestamp("03/01/2023 05:00:00 AM"), Some(expected));
        assert_eq!(parse_timestamp("2023-03-01T05:00:00+00:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2023-03-01"),
            Some(expected.date().and_time(NaiveTime::default()))
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2023-13-45"), None);
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value(" 85.5 ", false), Some(85.5));
        assert_eq!(parse_value("85,5", false), None);
        assert_eq!(parse_value("85,5", true), Some(85.5));
        assert_eq!(parse_value("NaN", false), None);
        assert_eq!(parse_value("inf", false), None);
        assert_eq!(parse_value("n/a", false), None);
    }

    #[test]
    fn test_granularity_periods() {
        let ts = at("2023-03-01 17:45:00");
        assert_eq!(Granularity::Day.period_of(ts), at("2023-03-01"));
        assert_eq!(Granularity::Native.period_of(ts), ts);
        assert_eq!(Granularity::Day.format(ts), "2023-03-01");
    }

    #[test]
    fn test_series_invariants() {
        let ok = Series::new(
            vec![point("2023-01-01", 80.0), point("2023-01-02", 82.0)],
            Granularity::Day,
        )
        .unwrap();
        assert_eq!(ok.len(), 2);
        assert_eq!(ok.values(), vec![80.0, 82.0]);
        assert_eq!(ok.step(), Duration::days(1));

        let unordered = Series::new(
            vec![point("2023-01-02", 80.0), point("2023-01-01", 82.0)],
            Granularity::Day,
        );
        assert!(unordered.is_err());

        let zero = Series::new(vec![point("2023-01-01", 0.0)], Granularity::Day);
        assert!(zero.is_err());

        assert!(matches!(
            Series::new(vec![], Granularity::Day),
            Err(ForecastError::EmptyDataset(_))
        ));
    }

    #[test]
    fn test_native_step_uses_last_spacing() {
        let series = Series::new(
            vec![
                point("2023-01-01 00:00:00", 80.0),
                point("2023-01-01 01:00:00", 81.0),
                point("2023-01-01 03:00:00", 79.0),
            ],
            Granularity::Native,
        )
        .unwrap();

        assert_eq!(series.step(), Duration::hours(2));
    }
}
