//! Anomaly Engine / Possible-Motionless Map (§4.7).
//!
//! Unexpected-Stopping (vehicle) and Motionless-Person share one algorithm,
//! parameterized by class-id set, time threshold, radius, and delete-after.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use track_types::{geom, AnalyticsModule, DetectionRecord};

/// Which of the two shared-algorithm detectors a map entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyKind {
    UnexpectedStopping,
    MotionlessPerson,
}

impl AnomalyKind {
    fn emitted_type(self) -> &'static str {
        match self {
            AnomalyKind::UnexpectedStopping => "UnexpectedStopping",
            AnomalyKind::MotionlessPerson => "MotionlessPerson",
        }
    }

    fn source(self) -> &'static str {
        match self {
            AnomalyKind::UnexpectedStopping => "ProcessorModule-UnexpectedStopping",
            AnomalyKind::MotionlessPerson => "ProcessorModule-MotionlessPerson",
        }
    }

    fn description(self, age: f64) -> String {
        match self {
            AnomalyKind::UnexpectedStopping => format!("Unexpected Stopping {age} seconds"),
            AnomalyKind::MotionlessPerson => format!("Motionless for {age} seconds"),
        }
    }
}

/// Per-detector parameters (§4.7's table): the class-id set it watches, the
/// dwell threshold before a Chebyshev check fires, the check's radius, and
/// the standalone pruning threshold.
pub struct AnomalyParams {
    pub kind: AnomalyKind,
    pub class_ids: HashSet<String>,
    pub thresh_sec: f64,
    pub thresh_mtr: f64,
    pub delete_sec: f64,
}

struct MotionlessEntry {
    start_time: DateTime<Utc>,
    delete_sec: f64,
    first_record: DetectionRecord,
}

/// Tracks, per `tracker_id`, the first sighting of an object that hasn't yet
/// either moved on or triggered (and thereby cleared) an anomaly check.
#[derive(Default)]
pub struct PossibleMotionlessMap {
    entries: HashMap<String, MotionlessEntry>,
}

impl PossibleMotionlessMap {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Run one detector's algorithm over `records`, returning emitted
    /// anomaly events (§4.7, steps 1-6).
    pub fn process(
        &mut self,
        records: &[DetectionRecord],
        params: &AnomalyParams,
        batch_timestamp: DateTime<Utc>,
    ) -> Vec<DetectionRecord> {
        if params.class_ids.is_empty() {
            return Vec::new();
        }

        let mut anomalies = Vec::new();
        for r in records {
            if !params.class_ids.contains(&r.object.class_id) {
                continue;
            }
            let key = &r.object.tracker_id;
            if key.is_empty() {
                continue;
            }

            match self.entries.get(key) {
                None => {
                    self.entries.insert(
                        key.clone(),
                        MotionlessEntry {
                            start_time: batch_timestamp,
                            delete_sec: params.delete_sec,
                            first_record: r.clone(),
                        },
                    );
                }
                Some(entry) => {
                    let age = (batch_timestamp - entry.start_time).as_seconds_f64();
                    if age < params.thresh_sec {
                        continue;
                    }
                    if geom::within_chebyshev_radius(
                        entry.first_record.centroid_point(),
                        r.centroid_point(),
                        params.thresh_mtr,
                    ) {
                        let analytics_module = AnalyticsModule {
                            id: "1".to_string(),
                            description: params.kind.description(age),
                            source: params.kind.source().to_string(),
                            version: "1.0".to_string(),
                            confidence: None,
                        };
                        anomalies.push(r.clone().into_anomaly(
                            entry.first_record.timestamp,
                            params.kind.emitted_type(),
                            analytics_module,
                        ));
                    }
                    self.entries.remove(key);
                }
            }
        }
        anomalies
    }

    /// Remove entries whose own age exceeds their `delete_sec` threshold
    /// (§4.7 "Pruning"), independent of the in-algorithm deletion above.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        self.entries
            .retain(|_, entry| (now - entry.start_time).as_seconds_f64() <= entry.delete_sec);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use track_types::{BoundingBox, Centroid, EventInfo, EventType, ObjectInfo, Place};

    fn rec(tracker_id: &str, class_id: &str, ts: DateTime<Utc>, x: f64, y: f64) -> DetectionRecord {
        DetectionRecord {
            timestamp: ts,
            sensor_id: "camA".to_string(),
            object: ObjectInfo {
                id: format!("id-{tracker_id}"),
                tracker_id: tracker_id.to_string(),
                class_id: class_id.to_string(),
                centroid: Centroid::new(x, y),
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
            event: EventInfo::new(EventType::DETECTION),
            place: Place::default(),
            video_path: String::new(),
            start_timestamp: None,
            end_timestamp: None,
            analytics_module: None,
        }
    }

    fn veh_params() -> AnomalyParams {
        AnomalyParams {
            kind: AnomalyKind::UnexpectedStopping,
            class_ids: ["car".to_string()].into_iter().collect(),
            thresh_sec: 300.0,
            thresh_mtr: 4.0,
            delete_sec: 600.0,
        }
    }

    #[test]
    fn first_sighting_only_inserts_no_anomaly() {
        let mut map = PossibleMotionlessMap::new();
        let t0 = Utc::now();
        let out = map.process(&[rec("t1", "car", t0, 5.0, 5.0)], &veh_params(), t0);
        assert!(out.is_empty());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn age_below_threshold_leaves_entry_untouched() {
        let mut map = PossibleMotionlessMap::new();
        let t0 = Utc::now();
        map.process(&[rec("t1", "car", t0, 5.0, 5.0)], &veh_params(), t0);
        let t1 = t0 + chrono::Duration::seconds(60);
        let out = map.process(&[rec("t1", "car", t1, 5.0, 5.0)], &veh_params(), t1);
        assert!(out.is_empty());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn scenario_c_stopped_vehicle_emits_one_anomaly_at_third_sighting() {
        let mut map = PossibleMotionlessMap::new();
        let params = veh_params();
        let t0 = Utc::now();
        assert!(map.process(&[rec("t1", "car", t0, 5.0, 5.0)], &params, t0).is_empty());

        let t60 = t0 + chrono::Duration::seconds(60);
        assert!(map.process(&[rec("t1", "car", t60, 5.0, 5.0)], &params, t60).is_empty());

        let t301 = t0 + chrono::Duration::seconds(301);
        let out = map.process(&[rec("t1", "car", t301, 5.0, 5.0)], &params, t301);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].event.event_type.0, "UnexpectedStopping");
        assert_eq!(out[0].start_timestamp, Some(t0));
        assert_eq!(out[0].end_timestamp, Some(t301));
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn scenario_d_no_anomaly_when_moved_outside_radius() {
        let mut map = PossibleMotionlessMap::new();
        let params = veh_params();
        let t0 = Utc::now();
        map.process(&[rec("t1", "car", t0, 5.0, 5.0)], &params, t0);

        let t301 = t0 + chrono::Duration::seconds(301);
        let out = map.process(&[rec("t1", "car", t301, 20.0, 20.0)], &params, t301);
        assert!(out.is_empty());
        // cleared regardless, so the timer restarts on the next sighting.
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn empty_tracker_id_and_ineligible_class_are_skipped() {
        let mut map = PossibleMotionlessMap::new();
        let t0 = Utc::now();
        map.process(&[rec("", "car", t0, 5.0, 5.0)], &veh_params(), t0);
        map.process(&[rec("t1", "person", t0, 5.0, 5.0)], &veh_params(), t0);
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn empty_class_id_set_disables_detector_entirely() {
        let mut map = PossibleMotionlessMap::new();
        let mut params = veh_params();
        params.class_ids.clear();
        let t0 = Utc::now();
        map.process(&[rec("t1", "car", t0, 5.0, 5.0)], &params, t0);
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn prune_drops_entries_past_their_own_delete_sec() {
        let mut map = PossibleMotionlessMap::new();
        let t0 = Utc::now();
        map.process(&[rec("t1", "car", t0, 5.0, 5.0)], &veh_params(), t0);
        map.prune(t0 + chrono::Duration::seconds(599));
        assert_eq!(map.len(), 1);
        map.prune(t0 + chrono::Duration::seconds(601));
        assert_eq!(map.len(), 0);
    }
}
