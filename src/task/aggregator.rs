//! Series Aggregator
//!
//! Groups data points by [`SeriesKey`] and keeps a running summary per group,
//! so a day of points never has to be held in memory at once.

use crate::tsdb::{DataPoint, SeriesKey};
use std::collections::HashMap;

/// Running avg/max/min over one series
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Summary {
    count: usize,
    sum: f64,
    max: f64,
    min: f64,
}

impl Summary {
    /// Summarize a slice of values
    pub fn of(values: &[f64]) -> Self {
        let mut summary = Self::default();
        for &value in values {
            summary.add(value);
        }
        summary
    }

    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.max = value;
            self.min = value;
        } else {
            self.max = self.max.max(value);
            self.min = self.min.min(value);
        }
        self.sum += value;
        self.count += 1;
    }

    /// Number of values seen
    pub fn count(&self) -> usize {
        self.count
    }

    /// Arithmetic mean, 0.0 when empty
    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum / self.count as f64
    }

    /// Largest value, 0.0 when empty
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Smallest value, 0.0 when empty
    pub fn min(&self) -> f64 {
        self.min
    }
}

/// Per-series accumulation of data points
#[derive(Debug, Default)]
pub struct SeriesAggregator {
    series: HashMap<SeriesKey, Summary>,
}

impl SeriesAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add points to a series. A series appears with its first point.
    pub fn add(&mut self, key: &SeriesKey, points: &[DataPoint]) {
        if points.is_empty() {
            return;
        }

        let summary = self.series.entry(key.clone()).or_default();
        for point in points {
            summary.add(point.value);
        }
    }

    /// Number of series seen
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Check if no series was seen
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Consume the aggregator. Order is unspecified.
    pub fn finish(self) -> HashMap<SeriesKey, Summary> {
        self.series
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tsdb::TagPair;

    fn key(host: u8) -> SeriesKey {
        SeriesKey::new(vec![0, 0, 1], vec![TagPair::new([0, 0, 1], [0, 0, host])])
    }

    fn points(values: &[f64]) -> Vec<DataPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| DataPoint::new(1427202000 + i as i64, v))
            .collect()
    }

    #[test]
    fn test_summary() {
        let summary = Summary::of(&[1.0, 2.0, 3.0]);
        assert_eq!(summary.avg(), 2.0);
        assert_eq!(summary.max(), 3.0);
        assert_eq!(summary.min(), 1.0);
        assert_eq!(summary.count(), 3);
    }

    #[test]
    fn test_empty_summary_is_zero() {
        let summary = Summary::of(&[]);
        assert_eq!(summary.avg(), 0.0);
        assert_eq!(summary.max(), 0.0);
        assert_eq!(summary.min(), 0.0);
    }

    #[test]
    fn test_negative_values() {
        let summary = Summary::of(&[-3.0, -1.0, -2.0]);
        assert_eq!(summary.max(), -1.0);
        assert_eq!(summary.min(), -3.0);
    }

    #[test]
    fn test_groups_by_series_key() {
        let mut aggregator = SeriesAggregator::new();
        aggregator.add(&key(1), &points(&[1.0, 2.0]));
        aggregator.add(&key(2), &points(&[10.0]));
        // a later hour of the first series
        aggregator.add(&key(1), &points(&[3.0]));

        let groups = aggregator.finish();
        assert_eq!(groups.len(), 2);

        let first = groups[&key(1)];
        assert_eq!((first.avg(), first.max(), first.min()), (2.0, 3.0, 1.0));

        let second = groups[&key(2)];
        assert_eq!((second.avg(), second.max(), second.min()), (10.0, 10.0, 10.0));
    }

    #[test]
    fn test_series_without_points_is_not_reported() {
        let mut aggregator = SeriesAggregator::new();
        aggregator.add(&key(7), &[]);

        assert!(aggregator.is_empty());
        assert!(aggregator.finish().is_empty());
    }
}
