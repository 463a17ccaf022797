//! Tunables from spec §6's configuration table, plus the camera-compatibility
//! adjacency lists from §4.3.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Which camera-compatibility rule is in effect (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    /// `overlapping_camera_ids` is set: only listed pairs may merge.
    OverlappingCameras,
    /// `dont_match_cameras_adj_list` is set: listed pairs may never merge.
    DontMatchCameras,
    /// Neither list configured: no cross-camera merge is ever allowed.
    Neither,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McTrackConfig {
    /// Adjacency of camera ids whose fields of view overlap. Mutually
    /// exclusive with `dont_match_cameras_adj_list`.
    pub overlapping_camera_ids: Option<HashMap<String, Vec<String>>>,
    /// Adjacency of camera ids whose detections must never be merged.
    pub dont_match_cameras_adj_list: Option<HashMap<String, Vec<String>>>,

    /// §4.2: complete-linkage cutoff for per-camera consolidation (default
    /// 1.5 m).
    pub intra_frame_period_clust_dist_m: f64,
    /// §4.2/§4.3: multiplier applied to a threshold distance to build a
    /// sentinel value large enough to forbid a match. Not named by spec.md's
    /// configuration table; see DESIGN.md Open Question decision.
    pub large_scale_factor: f64,
    /// §4.2: bearing is only (re)computed above this displacement (default
    /// 1 m).
    pub min_threshold_dist_m_within_resample_time: f64,
    /// §4.3: complete-linkage cutoff for cross-camera fusion (default 25 m).
    pub cluster_dist_thresh_m: f64,
    /// §4.3/§4.6: cluster-identity map entries older than this are pruned
    /// (default 20 s).
    pub clustered_obj_id_prunetime_sec: f64,
    /// §4.5: cross-window assignment distance ceiling (default 20 m).
    pub match_max_dist_m: f64,
    /// §4.5: carry-over entries older than this are pruned (default 2.5 s).
    pub carry_over_list_prune_time_in_sec: f64,
    /// §6 "Enable identity-propagation shortcut": when true, MCT-B's shared
    /// cluster-identity distance-zero override fires and the Cluster
    /// Identity Map is maintained after clustering; when false, neither
    /// runs (`mctracker.py:424`/`:606`'s
    /// `assume_objs_have_same_id_intra_frame_period` gate). Default true.
    pub object_ids_track_across_frames: bool,
}

impl Default for McTrackConfig {
    fn default() -> Self {
        Self {
            overlapping_camera_ids: None,
            dont_match_cameras_adj_list: None,
            intra_frame_period_clust_dist_m: 1.5,
            large_scale_factor: 1000.0,
            min_threshold_dist_m_within_resample_time: 1.0,
            cluster_dist_thresh_m: 25.0,
            clustered_obj_id_prunetime_sec: 20.0,
            match_max_dist_m: 20.0,
            carry_over_list_prune_time_in_sec: 2.5,
            object_ids_track_across_frames: true,
        }
    }
}

impl McTrackConfig {
    pub fn match_type(&self) -> MatchType {
        if self.overlapping_camera_ids.is_some() {
            MatchType::OverlappingCameras
        } else if self.dont_match_cameras_adj_list.is_some() {
            MatchType::DontMatchCameras
        } else {
            MatchType::Neither
        }
    }

    /// `INTRA_FRAME_PERIOD_CLUST_DIST_IN_M × INTRA_FRAME_CLUSTER_LARGE_SCALE_FACTOR`,
    /// the MCT-A non-match sentinel (§4.2).
    pub fn intra_frame_large_dist(&self) -> f64 {
        self.intra_frame_period_clust_dist_m * self.large_scale_factor
    }

    /// `CLUSTER_DIST_THRESH_IN_M × CLUSTER_DIFFT_CAMERAS_LARGE_SCALE_FACTOR`,
    /// the MCT-B non-match sentinel (§4.3).
    pub fn cross_camera_large_dist(&self) -> f64 {
        self.cluster_dist_thresh_m * self.large_scale_factor
    }

    fn adjacency_contains(list: &HashMap<String, Vec<String>>, a: &str, b: &str) -> bool {
        list.get(a).map(|v| v.iter().any(|c| c == b)).unwrap_or(false)
            || list.get(b).map(|v| v.iter().any(|c| c == a)).unwrap_or(false)
    }

    pub fn cameras_overlap(&self, a: &str, b: &str) -> bool {
        self.overlapping_camera_ids
            .as_ref()
            .map(|list| Self::adjacency_contains(list, a, b))
            .unwrap_or(false)
    }

    pub fn dont_match_cameras(&self, a: &str, b: &str) -> bool {
        self.dont_match_cameras_adj_list
            .as_ref()
            .map(|list| Self::adjacency_contains(list, a, b))
            .unwrap_or(false)
    }

    /// Whether a cross-camera pair may ever be merged, ignoring distance
    /// (§4.3 match_type rules).
    pub fn cameras_compatible(&self, a: &str, b: &str) -> bool {
        match self.match_type() {
            MatchType::OverlappingCameras => self.cameras_overlap(a, b),
            MatchType::DontMatchCameras => !self.dont_match_cameras(a, b),
            MatchType::Neither => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_type_defaults_to_neither() {
        let cfg = McTrackConfig::default();
        assert_eq!(cfg.match_type(), MatchType::Neither);
        assert!(!cfg.cameras_compatible("camA", "camB"));
    }

    #[test]
    fn overlap_list_is_bidirectional() {
        let mut cfg = McTrackConfig::default();
        let mut list = HashMap::new();
        list.insert("camA".to_string(), vec!["camB".to_string()]);
        cfg.overlapping_camera_ids = Some(list);
        assert!(cfg.cameras_compatible("camA", "camB"));
        assert!(cfg.cameras_compatible("camB", "camA"));
        assert!(!cfg.cameras_compatible("camA", "camC"));
    }
}
