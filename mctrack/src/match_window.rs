//! Cross-Window Matching (MCT-C, §4.5).

use ordered_float::NotNan;
use pathfinding::kuhn_munkres::kuhn_munkres_min;
use pathfinding::matrix::Matrix;
use track_types::{geom, DetectionRecord};

use crate::config::{MatchType, McTrackConfig};

/// Result of matching one batch's records against the previous window.
pub struct MatchOutcome {
    /// `current`, with matched records' `tracker_id`/`object.id`/direction
    /// updated in place; unmatched records are returned unchanged.
    pub current: Vec<DetectionRecord>,
    /// Unmatched `prev` records, candidates for the next carry-over set.
    pub carry_over: Vec<DetectionRecord>,
}

fn id_set(r: &DetectionRecord) -> Vec<&str> {
    if r.object.id_list.is_empty() {
        vec![r.object.id.as_str()]
    } else {
        r.object.id_list.iter().map(String::as_str).collect()
    }
}

fn shares_id(a: &DetectionRecord, b: &DetectionRecord) -> bool {
    let ids_b = id_set(b);
    id_set(a).iter().any(|id| ids_b.contains(id))
}

/// Override precedence (last check that applies wins, per `merge_costs`'s
/// cost_matrix being built from `dist * id_dist` and then overwritten by the
/// threshold/class/camera-rule loop, in that order): distance over
/// `match_max_dist_m` → sentinel; different `class_id` → sentinel; camera
/// rule incompatibility → sentinel; otherwise the raw distance, which is
/// already 0 if the pair shares an id.
fn mct_c_cost(prev: &DetectionRecord, curr: &DetectionRecord, cfg: &McTrackConfig, sentinel: f64) -> f64 {
    let raw = if shares_id(prev, curr) {
        0.0
    } else {
        geom::euclidean_dist(prev.centroid_point(), curr.centroid_point())
    };
    if raw > cfg.match_max_dist_m {
        sentinel
    } else if prev.object.class_id != curr.object.class_id {
        sentinel
    } else {
        match cfg.match_type() {
            MatchType::OverlappingCameras if !cfg.cameras_overlap(&prev.sensor_id, &curr.sensor_id) => sentinel,
            MatchType::DontMatchCameras if cfg.dont_match_cameras(&prev.sensor_id, &curr.sensor_id) => sentinel,
            MatchType::Neither => sentinel,
            _ => raw,
        }
    }
}

/// Match `prev` (the previous window's emitted + carried-over records)
/// against `current` (this batch's consolidated/fused moving-class
/// records), by minimum-cost bipartite assignment (§4.5).
pub fn match_window(prev: &[DetectionRecord], mut current: Vec<DetectionRecord>, cfg: &McTrackConfig) -> MatchOutcome {
    if prev.is_empty() {
        return MatchOutcome {
            current,
            carry_over: Vec::new(),
        };
    }
    if current.is_empty() {
        return MatchOutcome {
            current,
            carry_over: prev.to_vec(),
        };
    }

    let n_prev = prev.len();
    let n_curr = current.len();

    let mut final_dist = vec![vec![0.0f64; n_curr]; n_prev];
    let mut max_seen = 0.0f64;
    for row in prev.iter() {
        for col in current.iter() {
            let d = if shares_id(row, col) {
                0.0
            } else {
                geom::euclidean_dist(row.centroid_point(), col.centroid_point())
            };
            if d > max_seen {
                max_seen = d;
            }
        }
    }
    let sentinel = max_seen.max(cfg.match_max_dist_m * 1.1);
    for (i, row) in prev.iter().enumerate() {
        for (j, col) in current.iter().enumerate() {
            final_dist[i][j] = mct_c_cost(row, col, cfg, sentinel);
        }
    }

    // kuhn_munkres requires rows <= columns; pad with dummy zero-cost
    // columns when there are more prev entries than current ones, so every
    // extra prev row is free to match a dummy (i.e. stay unmatched).
    let padded_cols = n_curr.max(n_prev);
    let mut weights = Matrix::new(n_prev, padded_cols, NotNan::new(0.0).expect("0.0 is not NaN"));
    for i in 0..n_prev {
        for j in 0..n_curr {
            weights[(i, j)] = NotNan::new(final_dist[i][j].powi(2)).expect("squared distance is not NaN");
        }
    }

    let (_, assignment) = kuhn_munkres_min(&weights);

    let mut matched_curr = vec![false; n_curr];
    let mut matched_prev = vec![false; n_prev];
    for (i, &j) in assignment.iter().enumerate() {
        if j >= n_curr {
            continue;
        }
        if final_dist[i][j] > cfg.match_max_dist_m {
            continue;
        }
        matched_prev[i] = true;
        matched_curr[j] = true;

        let prev_point = prev[i].centroid_point();
        let curr_point = current[j].centroid_point();
        let dist = geom::euclidean_dist(prev_point, curr_point);
        let direction = if dist > 0.0 {
            geom::bearing_degrees(prev_point, curr_point)
        } else {
            prev[i].object.direction
        };

        current[j].object.tracker_id = prev[i].object.tracker_id.clone();
        current[j].object.id = prev[i].object.id.clone();
        current[j].object.direction = direction;
        current[j].object.orientation = direction;
    }

    let carry_over = prev
        .iter()
        .enumerate()
        .filter(|(i, _)| !matched_prev[*i])
        .map(|(_, r)| r.clone())
        .collect();

    let _ = matched_curr; // unmatched current records simply keep their input state.
    MatchOutcome { current, carry_over }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use track_types::{BoundingBox, Centroid, EventInfo, EventType, ObjectInfo, Place};

    fn rec(tracker_id: &str, x: f64, y: f64) -> DetectionRecord {
        DetectionRecord {
            timestamp: Utc::now(),
            sensor_id: "camA".to_string(),
            object: ObjectInfo {
                id: format!("id-{tracker_id}"),
                tracker_id: tracker_id.to_string(),
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

    /// With neither camera list configured, `match_type` is `Neither` and
    /// no pair is ever allowed to match (mirrors the source's "no matching
    /// rules set" branch, which forces every cost to the sentinel). Tests
    /// that expect a real match need an (even empty) `dont_match_cameras`
    /// list to select `MatchType::DontMatchCameras` instead.
    fn permissive_config() -> McTrackConfig {
        let mut cfg = McTrackConfig::default();
        cfg.dont_match_cameras_adj_list = Some(std::collections::HashMap::new());
        cfg
    }

    #[test]
    fn close_record_matches_and_inherits_tracker_identity() {
        let prev = vec![rec("t1", 0.0, 0.0)];
        let current = vec![rec("", 1.0, 1.0)];
        let cfg = permissive_config();
        let out = match_window(&prev, current, &cfg);
        assert_eq!(out.current[0].object.tracker_id, "t1");
        assert_eq!(out.current[0].object.id, "id-t1");
        assert!(out.carry_over.is_empty());
    }

    #[test]
    fn far_record_is_not_matched_and_prev_carries_over() {
        let prev = vec![rec("t1", 0.0, 0.0)];
        let current = vec![rec("", 500.0, 500.0)];
        let cfg = permissive_config();
        let out = match_window(&prev, current, &cfg);
        assert_eq!(out.current[0].object.tracker_id, "");
        assert_eq!(out.carry_over.len(), 1);
        assert_eq!(out.carry_over[0].object.tracker_id, "t1");
    }

    #[test]
    fn more_prev_than_current_leaves_extra_prev_unmatched() {
        let prev = vec![rec("t1", 0.0, 0.0), rec("t2", 100.0, 100.0)];
        let current = vec![rec("", 0.5, 0.5)];
        let cfg = permissive_config();
        let out = match_window(&prev, current, &cfg);
        assert_eq!(out.current[0].object.tracker_id, "t1");
        assert_eq!(out.carry_over.len(), 1);
        assert_eq!(out.carry_over[0].object.tracker_id, "t2");
    }

    #[test]
    fn empty_current_carries_over_all_of_prev() {
        let prev = vec![rec("t1", 0.0, 0.0)];
        let out = match_window(&prev, Vec::new(), &McTrackConfig::default());
        assert_eq!(out.carry_over.len(), 1);
    }

    #[test]
    fn empty_prev_leaves_current_untouched() {
        let current = vec![rec("", 0.0, 0.0)];
        let out = match_window(&[], current, &McTrackConfig::default());
        assert_eq!(out.current[0].object.tracker_id, "");
        assert!(out.carry_over.is_empty());
    }
}
