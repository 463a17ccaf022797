//! Flow-Rate Accumulator (§4.8).

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use track_types::DetectionRecord;

/// Emitted once per window: per-hour entry/exit rates for one location.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowRateEvent {
    pub location: String,
    pub entry_rate_per_hour: f64,
    pub exit_rate_per_hour: f64,
    pub batch_timestamp: DateTime<Utc>,
}

/// Maintains `{entry_count, exit_count, window_start}` for one location,
/// normalizing to a per-hour rate once the window elapses (§4.8).
pub struct FlowRateAccumulator {
    location: String,
    update_period: Duration,
    entry_count: u64,
    exit_count: u64,
    window_start: Instant,
}

impl FlowRateAccumulator {
    pub fn new(location: impl Into<String>, update_sec: f64, now: Instant) -> Self {
        Self {
            location: location.into(),
            update_period: Duration::from_secs_f64(update_sec.max(0.0)),
            entry_count: 0,
            exit_count: 0,
            window_start: now,
        }
    }

    /// Tally this batch's entry/exit records, then emit and reset if the
    /// window has elapsed relative to `now`.
    pub fn record(
        &mut self,
        records: &[DetectionRecord],
        batch_timestamp: DateTime<Utc>,
        now: Instant,
    ) -> Option<FlowRateEvent> {
        for r in records {
            if r.event.event_type.is_entry() {
                self.entry_count += 1;
            } else if r.event.event_type.is_exit() {
                self.exit_count += 1;
            }
        }

        if now < self.window_start + self.update_period {
            return None;
        }

        let elapsed_hours = (now - self.window_start).as_secs_f64() / 3600.0;
        let event = FlowRateEvent {
            location: self.location.clone(),
            entry_rate_per_hour: if elapsed_hours > 0.0 {
                self.entry_count as f64 / elapsed_hours
            } else {
                0.0
            },
            exit_rate_per_hour: if elapsed_hours > 0.0 {
                self.exit_count as f64 / elapsed_hours
            } else {
                0.0
            },
            batch_timestamp,
        };

        self.entry_count = 0;
        self.exit_count = 0;
        self.window_start = now;
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use track_types::{BoundingBox, Centroid, EventInfo, ObjectInfo, Place};

    fn rec(event_type: &str) -> DetectionRecord {
        DetectionRecord {
            timestamp: Utc::now(),
            sensor_id: "camA".to_string(),
            object: ObjectInfo {
                id: "id-1".to_string(),
                tracker_id: String::new(),
                class_id: "car".to_string(),
                centroid: Centroid::new(0.0, 0.0),
                bbox: BoundingBox {
                    top_left_x: 0.0,
                    top_left_y: 0.0,
                    bottom_right_x: 1.0,
                    bottom_right_y: 1.0,
                },
                direction: 0.0,
                orientation: 0.0,
                id_list: Vec::new(),
            },
            event: EventInfo::new(event_type),
            place: Place::default(),
            video_path: String::new(),
            start_timestamp: None,
            end_timestamp: None,
            analytics_module: None,
        }
    }

    #[test]
    fn within_window_accumulates_without_emitting() {
        let now = Instant::now();
        let mut acc = FlowRateAccumulator::new("lobby", 3600.0, now);
        let out = acc.record(&[rec("entry"), rec("exit"), rec("exit")], Utc::now(), now);
        assert!(out.is_none());
    }

    #[test]
    fn window_elapsed_emits_normalized_rate_and_resets() {
        let now = Instant::now();
        let mut acc = FlowRateAccumulator::new("lobby", 1.0, now);
        let later = now + Duration::from_secs(2);
        let batch_ts = Utc::now();
        let out = acc.record(&[rec("entry"), rec("entry"), rec("exit")], batch_ts, later).unwrap();
        assert_eq!(out.location, "lobby");
        assert_eq!(out.batch_timestamp, batch_ts);
        assert!((out.entry_rate_per_hour - 2.0 / (2.0 / 3600.0)).abs() < 1e-6);
        assert!((out.exit_rate_per_hour - 1.0 / (2.0 / 3600.0)).abs() < 1e-6);

        let next = acc.record(&[], Utc::now(), later);
        assert!(next.is_none());
    }

    #[test]
    fn non_entry_exit_events_are_ignored() {
        let now = Instant::now();
        let mut acc = FlowRateAccumulator::new("lobby", 1.0, now);
        let later = now + Duration::from_secs(1);
        let out = acc.record(&[rec("detection")], Utc::now(), later).unwrap();
        assert_eq!(out.entry_rate_per_hour, 0.0);
        assert_eq!(out.exit_rate_per_hour, 0.0);
    }
}
