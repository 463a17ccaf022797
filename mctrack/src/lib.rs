//! Multi-camera tracker: per-batch consolidation, cross-camera fusion, and
//! cross-window matching (§1 "MCT").

pub mod cluster;
pub mod config;
pub mod consolidate;
pub mod fuse;
pub mod identity;
pub mod match_window;
pub mod select;
pub mod synthetic;

use chrono::{DateTime, Utc};
use track_types::DetectionRecord;

pub use config::{MatchType, McTrackConfig};
pub use identity::ClusterIdentityMap;

/// Stable sort by ascending timestamp, then partition into moving-class
/// (`detection`/`detection_adj`) and `others` (§4.1).
fn sort_and_classify(mut records: Vec<DetectionRecord>) -> (Vec<DetectionRecord>, Vec<DetectionRecord>) {
    records.sort_by_key(|r| r.timestamp);
    let mut moving = Vec::with_capacity(records.len());
    let mut others = Vec::new();
    for r in records {
        if r.event.event_type.is_moving_class() {
            moving.push(r);
        } else {
            others.push(r);
        }
    }
    (moving, others)
}

/// Per-pipeline MCT state: the cluster identity map, the carry-over set
/// from the previous window, and the monotonic synthetic-id counter (§3).
pub struct McTrackPipeline {
    cfg: McTrackConfig,
    identity: ClusterIdentityMap,
    prev_list: Vec<DetectionRecord>,
    unknown_id_counter: u64,
}

impl McTrackPipeline {
    pub fn new(cfg: McTrackConfig) -> Self {
        Self {
            cfg,
            identity: ClusterIdentityMap::new(),
            prev_list: Vec::new(),
            unknown_id_counter: 0,
        }
    }

    pub fn config(&self) -> &McTrackConfig {
        &self.cfg
    }

    /// Run one batch through MCT-A → MCT-B → MCT-C and synthetic id
    /// assignment (§2 stages 2-5). Returns the batch's emitted records
    /// (moving-class, matched/freshly-identified, plus `others` unchanged).
    ///
    /// `now` anchors the wall-clock-driven pruning (cluster identity map,
    /// carry-over set) that must advance on every poll tick regardless of
    /// whether `records` is empty (§4.3/§4.5's "after each batch" prunes are
    /// not conditioned on any detections having arrived).
    pub fn process_batch(&mut self, records: Vec<DetectionRecord>, now: DateTime<Utc>) -> Vec<DetectionRecord> {
        if records.is_empty() {
            self.identity.prune(now, self.cfg.clustered_obj_id_prunetime_sec);
            let stale = std::mem::take(&mut self.prev_list);
            self.prev_list = self.carry_over_after_pruning(stale, now);
            return Vec::new();
        }

        let (moving, others) = sort_and_classify(records);
        let batch_ts: DateTime<Utc> = moving.first().map(|r| r.timestamp).unwrap_or(now);

        let consolidated = consolidate::consolidate_per_camera(moving, &self.cfg);
        let fused = fuse::fuse_cross_camera(consolidated, &self.cfg, &mut self.identity, batch_ts);

        let (current, carry_over) = if self.prev_list.is_empty() {
            let mut fresh = fused;
            synthetic::assign_synthetic_ids(&mut fresh, &mut self.unknown_id_counter);
            (fresh, Vec::new())
        } else {
            let outcome = match_window::match_window(&self.prev_list, fused, &self.cfg);
            let mut current = outcome.current;
            // Only records still unmatched after MCT-C need a synthetic id;
            // matched records already inherited a resolved tracker_id, and
            // re-running assign_synthetic_id on those would wrap them in a
            // spurious TRK- prefix.
            for r in current.iter_mut().filter(|r| r.object.tracker_id.is_empty()) {
                synthetic::assign_synthetic_id(r, &mut self.unknown_id_counter);
            }
            let carry_over = self.carry_over_after_pruning(outcome.carry_over, batch_ts);
            (current, carry_over)
        };

        self.identity.prune(batch_ts, self.cfg.clustered_obj_id_prunetime_sec);

        // Next round's matching pool is this batch's emitted records plus
        // whatever from `prev_list` still didn't find a match (§4.5).
        self.prev_list = current.clone();
        self.prev_list.extend(carry_over);

        let mut retval = current;
        retval.extend(others);
        retval
    }

    fn carry_over_after_pruning(
        &self,
        carry_over: Vec<DetectionRecord>,
        batch_ts: DateTime<Utc>,
    ) -> Vec<DetectionRecord> {
        carry_over
            .into_iter()
            .filter(|r| {
                let age = (batch_ts - r.timestamp).num_milliseconds() as f64 / 1000.0;
                age <= self.cfg.carry_over_list_prune_time_in_sec
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use track_types::{BoundingBox, Centroid, EventInfo, EventType, ObjectInfo, Place};

    fn rec(sensor: &str, local_id: &str, ts: DateTime<Utc>, x: f64, y: f64) -> DetectionRecord {
        DetectionRecord {
            timestamp: ts,
            sensor_id: sensor.to_string(),
            object: ObjectInfo {
                id: DetectionRecord::normalize_object_id(sensor, local_id),
                tracker_id: String::new(),
                class_id: "car".to_string(),
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

    #[test]
    fn empty_batch_returns_nothing() {
        let mut pipeline = McTrackPipeline::new(McTrackConfig::default());
        assert!(pipeline.process_batch(Vec::new(), Utc::now()).is_empty());
    }

    #[test]
    fn first_batch_assigns_unknown_synthetic_ids() {
        let mut pipeline = McTrackPipeline::new(McTrackConfig::default());
        let t0 = Utc::now();
        let out = pipeline.process_batch(vec![rec("camA", "a1", t0, 0.0, 0.0)], t0);
        assert_eq!(out.len(), 1);
        assert!(out[0].object.tracker_id.starts_with("UNK-car-"));
    }

    #[test]
    fn second_batch_inherits_tracker_id_for_nearby_record() {
        // An empty `dont_match_cameras_adj_list` selects MatchType::DontMatchCameras
        // (never excludes any pair), since the default MatchType::Neither
        // forbids every cross-window match, same-camera included.
        let mut cfg = McTrackConfig::default();
        cfg.dont_match_cameras_adj_list = Some(std::collections::HashMap::new());
        let mut pipeline = McTrackPipeline::new(cfg);
        let t0 = Utc::now();
        let first = pipeline.process_batch(vec![rec("camA", "a1", t0, 0.0, 0.0)], t0);
        let tracker_id = first[0].object.tracker_id.clone();

        let t1 = t0 + chrono::Duration::milliseconds(500);
        let second = pipeline.process_batch(vec![rec("camA", "a1", t1, 0.5, 0.5)], t1);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].object.tracker_id, tracker_id);
    }

    #[test]
    fn carry_over_expires_after_prune_window_even_across_empty_batches() {
        // An empty `dont_match_cameras_adj_list` selects MatchType::DontMatchCameras
        // so a later same-position record would match if the carry-over
        // survived.
        let mut cfg = McTrackConfig::default();
        cfg.dont_match_cameras_adj_list = Some(std::collections::HashMap::new());
        let mut pipeline = McTrackPipeline::new(cfg);

        let t0 = Utc::now();
        let first = pipeline.process_batch(vec![rec("camA", "a1", t0, 0.0, 0.0)], t0);
        let tracker_id = first[0].object.tracker_id.clone();

        // An empty batch one second later must still run wall-clock pruning
        // (§8 invariant 3) but the record isn't stale yet (prune window 2.5s).
        let t1 = t0 + chrono::Duration::milliseconds(1_000);
        assert!(pipeline.process_batch(Vec::new(), t1).is_empty());

        // A second empty batch pushes the carried-over record's age past the
        // prune window, so it must be dropped even though no detections
        // arrived in between to trigger it.
        let t2 = t0 + chrono::Duration::milliseconds(3_000);
        assert!(pipeline.process_batch(Vec::new(), t2).is_empty());

        let t3 = t0 + chrono::Duration::milliseconds(3_100);
        let fourth = pipeline.process_batch(vec![rec("camA", "a1", t3, 0.0, 0.0)], t3);
        assert_eq!(fourth.len(), 1);
        assert_ne!(fourth[0].object.tracker_id, tracker_id);
        assert!(fourth[0].object.tracker_id.starts_with("UNK-car-"));
    }

    #[test]
    fn others_pass_through_unchanged() {
        let mut pipeline = McTrackPipeline::new(McTrackConfig::default());
        let t0 = Utc::now();
        let mut entry = rec("camA", "a1", t0, 0.0, 0.0);
        entry.event = EventInfo::new(EventType::ENTRY);
        let out = pipeline.process_batch(vec![entry.clone()], t0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].event.event_type, entry.event.event_type);
        assert!(out[0].object.tracker_id.is_empty());
    }
}
