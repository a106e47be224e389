//! Rolling per-station rainfall history.
//!
//! When the live feed degrades to a single 5-minute slot, the last-hour
//! total is rebuilt from slots observed on earlier fetches.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// How long a sample is retained relative to the newest one for its station.
pub const RETENTION_MINUTES: i64 = 65;
const HOUR_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Per-station sliding window of rainfall samples, kept sorted by time.
#[derive(Default)]
pub struct RollingRainBuffer {
    stations: DashMap<String, Vec<RollingPoint>>,
}

impl RollingRainBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a sample. Non-finite values are ignored, negatives clamp to 0,
    /// and a sample at an already-stored timestamp replaces the old value.
    pub fn push(&self, station_id: &str, timestamp: DateTime<Utc>, value: f64) {
        if !value.is_finite() {
            return;
        }
        let point = RollingPoint {
            timestamp,
            value: value.max(0.0),
        };

        let mut points = self.stations.entry(station_id.to_string()).or_default();
        match points.binary_search_by(|p| p.timestamp.cmp(&timestamp)) {
            Ok(idx) => points[idx] = point,
            Err(idx) => points.insert(idx, point),
        }

        if let Some(newest) = points.last().map(|p| p.timestamp) {
            let cutoff = newest - Duration::minutes(RETENTION_MINUTES);
            points.retain(|p| p.timestamp >= cutoff);
        }
    }

    /// Sum of samples in `[reference - 60min, reference]`, or `None` when no
    /// sample falls in range (no data, as opposed to zero rainfall).
    pub fn sum_last_hour(&self, station_id: &str, reference: DateTime<Utc>) -> Option<f64> {
        let points = self.stations.get(station_id)?;
        points
            .iter()
            .filter(|p| in_last_hour(p.timestamp, reference))
            .fold(None, |acc, p| Some(acc.unwrap_or(0.0) + p.value))
    }

    /// Minutes between the earliest in-range sample and `reference`, 0..=60.
    pub fn coverage_minutes(&self, station_id: &str, reference: DateTime<Utc>) -> u32 {
        let Some(points) = self.stations.get(station_id) else {
            return 0;
        };
        points
            .iter()
            .find(|p| in_last_hour(p.timestamp, reference))
            .map(|earliest| {
                (reference - earliest.timestamp)
                    .num_minutes()
                    .clamp(0, HOUR_MINUTES) as u32
            })
            .unwrap_or(0)
    }

    /// Stored samples for a station, oldest first.
    pub fn points(&self, station_id: &str) -> Vec<RollingPoint> {
        self.stations
            .get(station_id)
            .map(|p| p.value().clone())
            .unwrap_or_default()
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }
}

fn in_last_hour(ts: DateTime<Utc>, reference: DateTime<Utc>) -> bool {
    ts <= reference && ts >= reference - Duration::minutes(HOUR_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 2, 0, 0).unwrap()
    }

    #[test]
    fn prunes_samples_older_than_retention() {
        let buffer = RollingRainBuffer::new();
        let later = t0() + Duration::minutes(66);
        buffer.push("S1", t0(), 4.0);
        buffer.push("S1", later, 1.0);

        assert_eq!(
            buffer.points("S1"),
            vec![RollingPoint {
                timestamp: later,
                value: 1.0
            }]
        );
        assert_eq!(buffer.sum_last_hour("S1", later), Some(1.0));
    }

    #[test]
    fn ignores_non_finite_and_clamps_negative() {
        let buffer = RollingRainBuffer::new();
        buffer.push("S1", t0(), f64::NAN);
        buffer.push("S1", t0() + Duration::minutes(5), f64::INFINITY);
        assert!(buffer.points("S1").is_empty());

        buffer.push("S1", t0(), -2.0);
        assert_eq!(buffer.points("S1")[0].value, 0.0);
    }

    #[test]
    fn sum_distinguishes_zero_from_no_data() {
        let buffer = RollingRainBuffer::new();
        assert_eq!(buffer.sum_last_hour("S1", t0()), None);

        buffer.push("S1", t0(), 0.0);
        assert_eq!(buffer.sum_last_hour("S1", t0()), Some(0.0));
        assert_eq!(
            buffer.sum_last_hour("S1", t0() + Duration::minutes(61)),
            None
        );
    }

    #[test]
    fn accumulates_single_slot_fetches() {
        let buffer = RollingRainBuffer::new();
        for i in 0..4 {
            buffer.push("S1", t0() + Duration::minutes(5 * i), 2.5);
        }
        let reference = t0() + Duration::minutes(15);
        assert_eq!(buffer.sum_last_hour("S1", reference), Some(10.0));
        assert_eq!(buffer.coverage_minutes("S1", reference), 15);
    }

    #[test]
    fn repeated_timestamp_replaces_value() {
        let buffer = RollingRainBuffer::new();
        buffer.push("S1", t0(), 1.0);
        buffer.push("S1", t0(), 1.5);
        assert_eq!(buffer.points("S1").len(), 1);
        assert_eq!(buffer.sum_last_hour("S1", t0()), Some(1.5));
    }

    #[test]
    fn out_of_order_pushes_stay_sorted() {
        let buffer = RollingRainBuffer::new();
        buffer.push("S1", t0() + Duration::minutes(10), 1.0);
        buffer.push("S1", t0(), 1.0);
        buffer.push("S1", t0() + Duration::minutes(5), 1.0);
        let stamps: Vec<_> = buffer.points("S1").iter().map(|p| p.timestamp).collect();
        let mut sorted = stamps.clone();
        sorted.sort();
        assert_eq!(stamps, sorted);
    }

    #[test]
    fn coverage_capped_at_sixty() {
        let buffer = RollingRainBuffer::new();
        for i in 0..13 {
            buffer.push("S1", t0() + Duration::minutes(5 * i), 0.2);
        }
        let reference = t0() + Duration::minutes(60);
        assert_eq!(buffer.coverage_minutes("S1", reference), 60);
        assert_eq!(buffer.coverage_minutes("unknown", reference), 0);
    }

    #[test]
    fn stations_are_independent() {
        let buffer = RollingRainBuffer::new();
        buffer.push("S1", t0(), 1.0);
        buffer.push("S2", t0(), 2.0);
        assert_eq!(buffer.station_count(), 2);
        assert_eq!(buffer.sum_last_hour("S2", t0()), Some(2.0));
    }
}
