//! Synthetic identifier assignment (§4.6).

use track_types::DetectionRecord;

/// Mint a synthetic id for one record: `TRK-<class_id>-<tracker_id>` if it
/// already carries a (non-empty) tracker_id, else `UNK-<class_id>-<counter>`
/// with `counter` advanced.
pub fn assign_synthetic_id(r: &mut DetectionRecord, counter: &mut u64) {
    if r.object.tracker_id.is_empty() {
        r.object.tracker_id = format!("UNK-{}-{}", r.object.class_id, counter);
        *counter += 1;
    } else {
        r.object.tracker_id = format!("TRK-{}-{}", r.object.class_id, r.object.tracker_id);
    }
}

/// For any record whose `tracker_id` is still empty after matching, mint
/// one (§4.6).
pub fn assign_synthetic_ids(records: &mut [DetectionRecord], counter: &mut u64) {
    for r in records.iter_mut() {
        assign_synthetic_id(r, counter);
    }
}
