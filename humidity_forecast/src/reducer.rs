//! Collapse irregular observations into one value per period

use crate::data::{Granularity, Observation, ReductionPolicy, Series, SeriesPoint};
use crate::error::{ForecastError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// What the reducer kept and discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReductionReport {
    /// Observations with a parsed timestamp and value
    pub valid_observations: usize,
    /// Observations skipped because a field did not parse
    pub invalid_observations: usize,
    /// Valid observations discarded for reading exactly zero
    pub zero_readings_removed: usize,
    /// Periods whose reduced value was still exactly zero
    pub degenerate_periods_removed: usize,
    /// Periods in the resulting series
    pub periods: usize,
}

/// Groups observations by period and applies a [`ReductionPolicy`]
#[derive(Debug, Clone, Copy)]
pub struct SeriesReducer {
    granularity: Granularity,
    policy: ReductionPolicy,
}

impl SeriesReducer {
    pub fn new(granularity: Granularity, policy: ReductionPolicy) -> Self {
        Self {
            granularity,
            policy,
        }
    }

    /// Sort, drop zero readings, group by period and reduce.
    ///
    /// Sorting is stable, so readings sharing a timestamp keep file order and
    /// `FirstValid` picks the earliest of them.
    pub fn reduce(&self, observations: &[Observation]) -> Result<(Series, ReductionReport)> {
        let mut readings: Vec<(NaiveDateTime, f64)> =
            observations.iter().filter_map(Observation::valid).collect();

        let mut report = ReductionReport {
            valid_observations: readings.len(),
            invalid_observations: observations.len() - readings.len(),
            ..ReductionReport::default()
        };

        readings.sort_by_key(|(timestamp, _)| *timestamp);

        // Zero means the sensor did not report
        readings.retain(|(_, value)| *value != 0.0);
        report.zero_readings_removed = report.valid_observations - readings.len();

        let mut groups: Vec<(NaiveDateTime, Vec<f64>)> = Vec::new();
        for (timestamp, value) in readings {
            let period = self.granularity.period_of(timestamp);
            match groups.last_mut() {
                Some((current, values)) if *current == period => values.push(value),
                _ => groups.push((period, vec![value])),
            }
        }

        let mut points = Vec::with_capacity(groups.len());
        for (period, values) in groups {
            let value = match self.policy {
                ReductionPolicy::FirstValid => values[0],
                ReductionPolicy::Mean => values.iter().sum::<f64>() / values.len() as f64,
            };

            if value == 0.0 {
                report.degenerate_periods_removed += 1;
                continue;
            }
            points.push(SeriesPoint { period, value });
        }

        if points.is_empty() {
            return Err(ForecastError::EmptyDataset(format!(
                "No non-zero readings remain after cleaning ({} zero readings removed)",
                report.zero_readings_removed
            )));
        }

        report.periods = points.len();
        let series = Series::new(points, self.granularity)?;

        Ok((series, report))
    }
}
