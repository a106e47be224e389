//! Rainfall slot normalization.
//!
//! The rainfall feed returns several reading sets ("slots"), each a
//! timestamp with a 5-minute total per station. Slots arrive unordered and
//! occasionally jittered (two sets a few seconds apart for the same nominal
//! time). [`normalize_slots`] reduces them to a clean newest-first window.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use sgenv_api::types::ReadingSet;

/// Width of one de-duplication bucket.
pub const BUCKET_MINUTES: i64 = 5;
/// Maximum age of a slot relative to the newest one.
pub const WINDOW_MINUTES: i64 = 60;
/// Maximum number of slots in a normalized window.
pub const MAX_SLOTS: usize = 12;

/// A reading set with its parsed timestamp.
#[derive(Debug, Clone)]
pub struct RainSlot {
    pub timestamp: DateTime<Utc>,
    pub reading: ReadingSet,
}

impl RainSlot {
    /// Finite, non-negative value reported by `station_id`.
    pub fn value_for(&self, station_id: &str) -> Option<f64> {
        self.reading
            .value_for(station_id)
            .filter(|v| v.is_finite())
            .map(|v| v.max(0.0))
    }
}

fn bucket_key(ts: DateTime<Utc>) -> i64 {
    ts.timestamp().div_euclid(BUCKET_MINUTES * 60)
}

/// Sorts, windows, and de-duplicates raw reading sets.
///
/// The result is newest-first, holds at most [`MAX_SLOTS`] slots, spans no
/// more than [`WINDOW_MINUTES`] from its first slot, and contains at most
/// one slot per 5-minute bucket (the newest one seen). Sets without a
/// parseable timestamp are dropped.
pub fn normalize_slots(readings: &[ReadingSet]) -> Vec<RainSlot> {
    let mut dated: Vec<(DateTime<Utc>, &ReadingSet)> = readings
        .iter()
        .filter_map(|r| r.parsed_timestamp().map(|ts| (ts, r)))
        .collect();
    dated.sort_by(|a, b| b.0.cmp(&a.0));

    let Some(&(newest, _)) = dated.first() else {
        return Vec::new();
    };
    let cutoff = newest - Duration::minutes(WINDOW_MINUTES);

    let mut seen = HashSet::new();
    let mut slots = Vec::with_capacity(MAX_SLOTS);
    for (ts, reading) in dated {
        if ts < cutoff {
            break;
        }
        if !seen.insert(bucket_key(ts)) {
            continue;
        }
        slots.push(RainSlot {
            timestamp: ts,
            reading: reading.clone(),
        });
        if slots.len() == MAX_SLOTS {
            break;
        }
    }
    slots
}

/// Sum of a station's values across every slot, `None` if it reported in none.
pub fn window_total(slots: &[RainSlot], station_id: &str) -> Option<f64> {
    slots
        .iter()
        .filter_map(|slot| slot.value_for(station_id))
        .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

/// Minutes between the oldest and newest slot, capped at the window length.
pub fn window_span_minutes(slots: &[RainSlot]) -> u32 {
    match (slots.first(), slots.last()) {
        (Some(newest), Some(oldest)) => (newest.timestamp - oldest.timestamp)
            .num_minutes()
            .clamp(0, WINDOW_MINUTES) as u32,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sgenv_api::types::StationValue;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 2, 0, 0).unwrap()
    }

    fn set_at(ts: DateTime<Utc>, value: f64) -> ReadingSet {
        ReadingSet {
            timestamp: ts.to_rfc3339(),
            data: vec![StationValue {
                station_id: "S1".to_string(),
                value: Some(value),
            }],
        }
    }

    #[test]
    fn empty_input() {
        assert!(normalize_slots(&[]).is_empty());
    }

    #[test]
    fn unparseable_timestamps_are_dropped() {
        let bad = ReadingSet {
            timestamp: "not a time".to_string(),
            data: Vec::new(),
        };
        assert!(normalize_slots(&[bad.clone()]).is_empty());

        let slots = normalize_slots(&[bad, set_at(base(), 1.0)]);
        assert_eq!(slots.len(), 1);
    }

    #[test]
    fn jittered_slots_collapse_to_newer() {
        let t = base();
        let sets = vec![
            set_at(t, 1.0),
            set_at(t + Duration::seconds(40), 2.0),
        ];
        let slots = normalize_slots(&sets);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].timestamp, t + Duration::seconds(40));
        assert_eq!(slots[0].value_for("S1"), Some(2.0));
    }

    #[test]
    fn window_caps_at_twelve_slots() {
        let t = base();
        let sets: Vec<ReadingSet> = (0..20)
            .map(|i| set_at(t - Duration::minutes(5 * i), i as f64))
            .collect();
        let slots = normalize_slots(&sets);
        assert_eq!(slots.len(), MAX_SLOTS);
        assert_eq!(slots[0].timestamp, t);
        assert_eq!(slots[11].timestamp, t - Duration::minutes(55));
        assert!(slots
            .windows(2)
            .all(|pair| pair[0].timestamp > pair[1].timestamp));
    }

    #[test]
    fn stops_at_cutoff() {
        let t = base();
        let sets = vec![
            set_at(t - Duration::minutes(61), 9.0),
            set_at(t, 1.0),
            set_at(t - Duration::minutes(30), 2.0),
        ];
        let slots = normalize_slots(&sets);
        assert_eq!(slots.len(), 2);
        assert_eq!(window_span_minutes(&slots), 30);
    }

    #[test]
    fn unordered_input_sorted_newest_first() {
        let t = base();
        let sets = vec![
            set_at(t - Duration::minutes(10), 1.0),
            set_at(t, 2.0),
            set_at(t - Duration::minutes(5), 3.0),
        ];
        let slots = normalize_slots(&sets);
        let order: Vec<_> = slots.iter().map(|s| s.value_for("S1")).collect();
        assert_eq!(order, vec![Some(2.0), Some(3.0), Some(1.0)]);
    }

    #[test]
    fn window_total_sums_and_distinguishes_missing() {
        let t = base();
        let slots = normalize_slots(&[
            set_at(t, 12.0),
            set_at(t - Duration::minutes(5), 23.0),
        ]);
        assert_eq!(window_total(&slots, "S1"), Some(35.0));
        assert_eq!(window_total(&slots, "S2"), None);
    }

    #[test]
    fn negative_values_clamp_to_zero() {
        let slots = normalize_slots(&[set_at(base(), -3.0)]);
        assert_eq!(slots[0].value_for("S1"), Some(0.0));
    }
}
