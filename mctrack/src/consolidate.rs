//! Per-Camera Consolidation (MCT-A, §4.2).

use std::collections::HashMap;

use track_types::{geom, DetectionRecord};

use crate::cluster::complete_linkage_clusters;
use crate::config::McTrackConfig;
use crate::select::select_representative;

struct OrderedGroups<K> {
    order: Vec<K>,
    groups: HashMap<K, Vec<DetectionRecord>>,
}

impl<K: std::hash::Hash + Eq + Clone> OrderedGroups<K> {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            groups: HashMap::new(),
        }
    }

    fn push(&mut self, key: K, record: DetectionRecord) {
        self.groups
            .entry(key.clone())
            .or_insert_with(|| {
                self.order.push(key.clone());
                Vec::new()
            })
            .push(record);
    }

    fn into_groups(self) -> Vec<Vec<DetectionRecord>> {
        let Self { order, mut groups } = self;
        order
            .into_iter()
            .map(|k| groups.remove(&k).expect("key present"))
            .collect()
    }
}

/// Pairwise distance override for MCT-A's clustering (§4.2 step 3): same
/// `object.id` → 0, same timestamp → large, different class → large, else
/// plain Euclidean distance.
fn mct_a_distance(records: &[DetectionRecord], i: usize, j: usize, cfg: &McTrackConfig) -> f64 {
    let a = &records[i];
    let b = &records[j];
    if a.object.id == b.object.id {
        0.0
    } else if a.timestamp == b.timestamp {
        cfg.intra_frame_large_dist()
    } else if a.object.class_id != b.object.class_id {
        cfg.intra_frame_large_dist()
    } else {
        geom::euclidean_dist(a.centroid_point(), b.centroid_point())
    }
}

/// Cluster one camera's records and unify `object.id` within each cluster
/// to the cluster representative's id (§4.2 steps 1-5).
fn cluster_and_unify_ids(mut records: Vec<DetectionRecord>, cfg: &McTrackConfig) -> Vec<DetectionRecord> {
    if records.len() < 2 {
        return records;
    }
    let clusters = complete_linkage_clusters(
        records.len(),
        |i, j| mct_a_distance(&records, i, j, cfg),
        cfg.intra_frame_period_clust_dist_m,
    );
    for cluster in clusters {
        if cluster.len() < 2 {
            continue;
        }
        let members: Vec<DetectionRecord> = cluster.iter().map(|&i| records[i].clone()).collect();
        let rep_idx = cluster[select_representative(&members)];
        let rep_id = records[rep_idx].object.id.clone();
        for &idx in &cluster {
            records[idx].object.id = rep_id.clone();
        }
    }
    records
}

/// Collate one `(sensor_id, object.id)` group into a single emitted record
/// (§4.2 "Collation").
fn collate_group(mut group: Vec<DetectionRecord>, cfg: &McTrackConfig) -> DetectionRecord {
    if group.len() == 1 {
        return group.pop().expect("len == 1");
    }
    group.sort_by_key(|r| r.timestamp);

    let first_point = group.first().expect("non-empty").centroid_point();
    let last_point = group.last().expect("non-empty").centroid_point();
    let displacement = geom::euclidean_dist(first_point, last_point);

    let mean_x = group.iter().map(|r| r.object.centroid.x).sum::<f64>() / group.len() as f64;
    let mean_y = group.iter().map(|r| r.object.centroid.y).sum::<f64>() / group.len() as f64;

    const MIN_THRESHOLD_DIST_REASON: &str = "mct-a per-camera consolidation";
    for r in group.iter_mut() {
        r.object
            .centroid
            .smooth_to(mean_x, mean_y, MIN_THRESHOLD_DIST_REASON);
    }

    let mut last = group.pop().expect("non-empty");
    if displacement > cfg.min_threshold_dist_m_within_resample_time {
        let bearing = geom::bearing_degrees(first_point, last_point);
        last.object.direction = bearing;
        last.object.orientation = bearing;
    }
    last
}

/// Group records by `sensor_id`, per-camera consolidate each group, then
/// collate by `(sensor_id, object.id)` (§4.2). `others` (non-moving-class
/// records) should not be passed here; see §4.1.
pub fn consolidate_per_camera(records: Vec<DetectionRecord>, cfg: &McTrackConfig) -> Vec<DetectionRecord> {
    let mut by_sensor: OrderedGroups<String> = OrderedGroups::new();
    for r in records {
        by_sensor.push(r.sensor_id.clone(), r);
    }

    let mut output = Vec::new();
    for sensor_group in by_sensor.into_groups() {
        let unified = cluster_and_unify_ids(sensor_group, cfg);

        let mut by_object: OrderedGroups<String> = OrderedGroups::new();
        for r in unified {
            by_object.push(r.object.id.clone(), r);
        }
        for object_group in by_object.into_groups() {
            output.push(collate_group(object_group, cfg));
        }
    }
    output
}
