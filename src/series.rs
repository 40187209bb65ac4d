//! Pollutant time-series input types.
//!
//! The surrounding application aggregates raw measurement records into one
//! series per pollutant (ascending, unique date keys). This module only
//! defines the shape the note builder consumes plus the min/max scan the
//! value-to-pitch mapping is anchored to.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One aggregated data point: a year or year-month key and its mean value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Date key, e.g. "2019" or "2019-06". Ordering is the caller's contract.
    pub date: String,
    pub value: f64,
}

/// All series for one sonification, keyed by pollutant code (e.g. "NO2").
pub type SeriesMap = HashMap<String, Vec<SeriesPoint>>;

/// Min/max of an entire series, ignoring non-finite values.
///
/// Pitch and percussion mapping is always anchored to the full series range,
/// not the filtered window, so tightening a track's filter never re-tunes
/// the notes that survive it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    pub min: f64,
    pub max: f64,
}

impl SeriesStats {
    /// Scan a series. Returns `None` when no finite value exists, which the
    /// builder treats as "this track contributes zero notes".
    pub fn scan(points: &[SeriesPoint]) -> Option<SeriesStats> {
        let mut stats: Option<SeriesStats> = None;
        for p in points {
            if !p.value.is_finite() {
                continue;
            }
            stats = Some(match stats {
                None => SeriesStats { min: p.value, max: p.value },
                Some(s) => SeriesStats {
                    min: s.min.min(p.value),
                    max: s.max.max(p.value),
                },
            });
        }
        stats
    }

    /// Whether every finite value in the series is identical.
    pub fn is_flat(&self) -> bool {
        self.min == self.max
    }

    /// Span of the series range. Zero for a flat series.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}
