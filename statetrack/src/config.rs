//! State Tracker configuration (§4.7, §4.8, §6).
//!
//! `constants.py` in the source tree carries no values for any of these
//! thresholds; the defaults below are this crate's own engineering choice,
//! recorded as an Open Question decision in `DESIGN.md`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

fn default_stalled_veh_classids() -> HashSet<String> {
    ["car", "truck", "bus"].iter().map(|s| s.to_string()).collect()
}

fn default_motionless_classids() -> HashSet<String> {
    ["person"].iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateTrackConfig {
    pub stalled_veh_classids: HashSet<String>,
    pub stalled_veh_thresh_sec: f64,
    pub stalled_veh_thresh_mtr: f64,
    pub stalled_veh_delete_sec: f64,

    pub motionless_classids: HashSet<String>,
    pub motionless_thresh_sec: f64,
    pub motionless_thresh_mtr: f64,
    pub motionless_delete_sec: f64,

    pub entry_exit_update_sec: f64,
}

impl Default for StateTrackConfig {
    fn default() -> Self {
        Self {
            stalled_veh_classids: default_stalled_veh_classids(),
            stalled_veh_thresh_sec: 300.0,
            stalled_veh_thresh_mtr: 4.0,
            stalled_veh_delete_sec: 600.0,

            motionless_classids: default_motionless_classids(),
            motionless_thresh_sec: 300.0,
            motionless_thresh_mtr: 2.0,
            motionless_delete_sec: 600.0,

            entry_exit_update_sec: 3600.0,
        }
    }
}
