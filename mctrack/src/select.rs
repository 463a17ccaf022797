//! Representative selection (§4.4).

use track_types::DetectionRecord;

/// Index of the representative chosen from a non-empty slice, by priority:
/// `detection` over `detection_adj`, then non-empty `videoPath`, then
/// smallest `object.id` lexicographically.
pub fn select_representative(records: &[DetectionRecord]) -> usize {
    records
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| priority_key(a).cmp(&priority_key(b)))
        .map(|(i, _)| i)
        .expect("records is non-empty")
}

fn priority_key(r: &DetectionRecord) -> (u8, u8, &str) {
    let type_rank = if r.event.event_type.is_detection() { 0 } else { 1 };
    let video_rank = if r.video_path.is_empty() { 1 } else { 0 };
    (type_rank, video_rank, r.object.id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use track_types::{BoundingBox, Centroid, EventInfo, EventType, ObjectInfo, Place};

    fn rec(id: &str, event_type: &str, video_path: &str) -> DetectionRecord {
        DetectionRecord {
            timestamp: Utc::now(),
            sensor_id: "cam".to_string(),
            object: ObjectInfo {
                id: id.to_string(),
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
            video_path: video_path.to_string(),
            start_timestamp: None,
            end_timestamp: None,
            analytics_module: None,
        }
    }

    #[test]
    fn detection_beats_detection_adj() {
        let records = vec![
            rec("b", EventType::DETECTION_ADJ, ""),
            rec("a", EventType::DETECTION, ""),
        ];
        assert_eq!(select_representative(&records), 1);
    }

    #[test]
    fn video_path_breaks_ties_among_equal_type() {
        let records = vec![
            rec("b", EventType::DETECTION, ""),
            rec("a", EventType::DETECTION, "video.mp4"),
        ];
        assert_eq!(select_representative(&records), 1);
    }

    #[test]
    fn smallest_id_breaks_remaining_ties() {
        let records = vec![
            rec("z", EventType::DETECTION, ""),
            rec("a", EventType::DETECTION, ""),
        ];
        assert_eq!(select_representative(&records), 1);
    }
}
