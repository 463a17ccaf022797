//! Pipeline configuration: a JSON object enumerating recognized options
//! (§6 "Configuration").

use std::path::Path;

use mctrack::McTrackConfig;
use serde::{Deserialize, Serialize};
use statetrack::StateTrackConfig;

use crate::error::TrackStreamError;
use crate::player::ReplayBatchMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackStreamConfig {
    /// Loop period / replay cadence (default 0.5 s).
    pub resample_time_sec: f64,
    /// Broker poll timeout (default 0.5 s).
    pub input_queue_wait_sec: f64,
    /// This instance's location tag, stamped on flow-rate events and used
    /// to derive `objectmarker`'s `messageid` fallback.
    pub location: String,
    pub verbose_log: bool,
    pub profile_time: bool,
    /// File-replay batching mode (§6 "File-replay mode"): when set, batches
    /// are this many records each, in file order, instead of windowed by
    /// `resample_time_sec`. `None` (default) uses the timestamp window.
    pub num_recs_per_batch: Option<usize>,
    #[serde(flatten)]
    pub mctrack: McTrackConfig,
    #[serde(flatten)]
    pub statetrack: StateTrackConfig,
}

impl Default for TrackStreamConfig {
    fn default() -> Self {
        Self {
            resample_time_sec: 0.5,
            input_queue_wait_sec: 0.5,
            location: "default".to_string(),
            verbose_log: false,
            profile_time: false,
            num_recs_per_batch: None,
            mctrack: McTrackConfig::default(),
            statetrack: StateTrackConfig::default(),
        }
    }
}

impl TrackStreamConfig {
    pub fn from_json_str(s: &str) -> Result<Self, TrackStreamError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, TrackStreamError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Which replay-batching mode this config selects (§6 "File-replay
    /// mode").
    pub fn replay_batch_mode(&self) -> ReplayBatchMode {
        match self.num_recs_per_batch {
            Some(n) => ReplayBatchMode::RecordCount(n),
            None => ReplayBatchMode::TimestampWindow(self.resample_time_sec),
        }
    }
}
