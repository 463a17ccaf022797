//! State Tracker: the stateful anomaly engine and flow-rate accumulator
//! that run on MCT's output (§1 "ST", §4.7, §4.8).

pub mod anomaly;
pub mod config;
pub mod flow;

use std::time::Instant;

use chrono::{DateTime, Utc};
use track_types::DetectionRecord;

pub use anomaly::{AnomalyKind, AnomalyParams, PossibleMotionlessMap};
pub use config::StateTrackConfig;
pub use flow::{FlowRateAccumulator, FlowRateEvent};

/// One batch's output: anomaly events to the anomaly egress, an optional
/// flow-rate event once its window elapses, and the input records
/// untouched (§6 "Egress (anomalies)" is additive, not a replacement).
pub struct StateTrackOutcome {
    pub anomalies: Vec<DetectionRecord>,
    pub flow_event: Option<FlowRateEvent>,
}

/// Per-pipeline ST state: the Possible-Motionless Map and the Flow-Rate
/// Accumulator, both process-wide mutable state local to one pipeline
/// instance (§5 "Shared resources").
pub struct StateTrackPipeline {
    cfg: StateTrackConfig,
    motionless: PossibleMotionlessMap,
    flow: FlowRateAccumulator,
}

impl StateTrackPipeline {
    pub fn new(cfg: StateTrackConfig, location: impl Into<String>, now: Instant) -> Self {
        let flow = FlowRateAccumulator::new(location, cfg.entry_exit_update_sec, now);
        Self {
            cfg,
            motionless: PossibleMotionlessMap::new(),
            flow,
        }
    }

    pub fn config(&self) -> &StateTrackConfig {
        &self.cfg
    }

    fn vehicle_params(&self) -> AnomalyParams {
        AnomalyParams {
            kind: AnomalyKind::UnexpectedStopping,
            class_ids: self.cfg.stalled_veh_classids.clone(),
            thresh_sec: self.cfg.stalled_veh_thresh_sec,
            thresh_mtr: self.cfg.stalled_veh_thresh_mtr,
            delete_sec: self.cfg.stalled_veh_delete_sec,
        }
    }

    fn person_params(&self) -> AnomalyParams {
        AnomalyParams {
            kind: AnomalyKind::MotionlessPerson,
            class_ids: self.cfg.motionless_classids.clone(),
            thresh_sec: self.cfg.motionless_thresh_sec,
            thresh_mtr: self.cfg.motionless_thresh_mtr,
            delete_sec: self.cfg.motionless_delete_sec,
        }
    }

    /// Run both anomaly detectors and the flow-rate accumulator over one
    /// batch of (already MCT-processed) records, then prune the
    /// Possible-Motionless Map (§4.7 "Pruning").
    pub fn process_batch(
        &mut self,
        records: &[DetectionRecord],
        batch_timestamp: DateTime<Utc>,
        now: Instant,
    ) -> StateTrackOutcome {
        let mut anomalies = self
            .motionless
            .process(records, &self.vehicle_params(), batch_timestamp);
        anomalies.extend(self.motionless.process(records, &self.person_params(), batch_timestamp));
        anomalies.sort_by_key(|r| r.timestamp);

        let flow_event = self.flow.record(records, batch_timestamp, now);

        self.motionless.prune(batch_timestamp);

        StateTrackOutcome { anomalies, flow_event }
    }
}
