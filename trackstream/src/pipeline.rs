//! The per-batch orchestration of MCT then ST (§2), and the poll/process/
//! write/sleep loop around it (§5 "Suspension points").

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use mctrack::McTrackPipeline;
use statetrack::{FlowRateEvent, StateTrackPipeline};
use track_types::DetectionRecord;

use crate::config::TrackStreamConfig;
use crate::sink::{AnomalySink, BrokerClient, StorageSink};
use crate::stats::LoopStats;

/// One batch's full result: the MCT-emitted records (moving-class plus
/// passthrough `others`), anomaly events, and an optional flow-rate event.
pub struct BatchOutcome {
    pub emitted: Vec<DetectionRecord>,
    pub anomalies: Vec<DetectionRecord>,
    pub flow_event: Option<FlowRateEvent>,
}

/// Owns the Cluster Identity Map, Carry-Over Set, Possible-Motionless Map,
/// and Flow-Rate Accumulator for one pipeline instance (§5 "Shared
/// resources": no locking, single task ownership).
pub struct TrackStreamPipeline {
    cfg: TrackStreamConfig,
    mct: McTrackPipeline,
    st: StateTrackPipeline,
}

impl TrackStreamPipeline {
    pub fn new(cfg: TrackStreamConfig, now: Instant) -> Self {
        let mct = McTrackPipeline::new(cfg.mctrack.clone());
        let st = StateTrackPipeline::new(cfg.statetrack.clone(), cfg.location.clone(), now);
        Self { cfg, mct, st }
    }

    pub fn config(&self) -> &TrackStreamConfig {
        &self.cfg
    }

    /// Run one polled batch through MCT then ST (§2 stages 2-7). An empty
    /// batch skips the MCT-A/B/C clustering stages, but the wall-clock-driven
    /// prunes (cluster identity map, carry-over set, Possible-Motionless Map)
    /// and the flow-rate window's elapsed-time check still run every tick
    /// (§4.3/§4.5/§4.7's prunes and §4.8's emission are defined purely by
    /// wall-clock time, not by batch occupancy).
    pub fn process_batch(&mut self, records: Vec<DetectionRecord>, now: Instant) -> BatchOutcome {
        let wall_clock = Utc::now();
        let batch_timestamp = records.iter().map(|r| r.timestamp).min().unwrap_or(wall_clock);

        let emitted = self.mct.process_batch(records, wall_clock);
        let st_out = self.st.process_batch(&emitted, batch_timestamp, now);

        BatchOutcome { emitted, anomalies: st_out.anomalies, flow_event: st_out.flow_event }
    }

    /// Dispatch this batch's outputs to the egress collaborators (§6
    /// "Egress"). Anomalies publish to the message-bus topic; the storage
    /// sink gets one `objectmarker` write per emitted record plus the
    /// flow-rate updates, if any fired this batch.
    pub fn dispatch(
        &self,
        outcome: &BatchOutcome,
        anomaly_sink: &dyn AnomalySink,
        storage_sink: &dyn StorageSink,
    ) {
        for anomaly in &outcome.anomalies {
            anomaly_sink.publish(anomaly);
        }
        for record in &outcome.emitted {
            storage_sink.write_objectmarker(record);
        }
        if let Some(flow) = &outcome.flow_event {
            storage_sink.write_flowrate_entry(&flow.location, flow.entry_rate_per_hour, flow.batch_timestamp);
            storage_sink.write_flowrate_exit(&flow.location, flow.exit_rate_per_hour, flow.batch_timestamp);
        }
    }
}

/// Run the poll/process/write/sleep loop until `broker` stops yielding and
/// `should_stop` returns true, or forever if `should_stop` never does (§5
/// "Suspension points"). Storage writes are dispatched fire-and-forget via
/// `tokio::spawn`, matching §5 point 2's "asynchronous...never retried by
/// the core".
pub async fn run_loop(
    mut pipeline: TrackStreamPipeline,
    mut broker: impl BrokerClient + 'static,
    anomaly_sink: Arc<dyn AnomalySink>,
    storage_sink: Arc<dyn StorageSink>,
    stats: &mut LoopStats,
    mut should_stop: impl FnMut() -> bool,
) {
    let resample_period = Duration::from_secs_f64(pipeline.cfg.resample_time_sec.max(0.0));
    let poll_timeout = Duration::from_secs_f64(pipeline.cfg.input_queue_wait_sec.max(0.0));
    let verbose_log = pipeline.cfg.verbose_log;
    let profile_time = pipeline.cfg.profile_time;

    while !should_stop() {
        let iter_start = Instant::now();

        // Suspension point 1: bounded poll.
        let batch = broker.poll(5000, poll_timeout);
        let batch_len = batch.len();

        let outcome = pipeline.process_batch(batch, Instant::now());

        if verbose_log {
            tracing::debug!(
                batch_len,
                emitted = outcome.emitted.len(),
                anomalies = outcome.anomalies.len(),
                flow_event = outcome.flow_event.is_some(),
                "processed batch"
            );
        }

        // Suspension point 2: fire-and-forget async writes.
        let anomalies = outcome.anomalies.clone();
        let emitted = outcome.emitted.clone();
        let flow_event = outcome.flow_event.clone();
        let anomaly_sink = anomaly_sink.clone();
        let storage_sink = storage_sink.clone();
        tokio::spawn(async move {
            for anomaly in &anomalies {
                anomaly_sink.publish(anomaly);
            }
            for record in &emitted {
                storage_sink.write_objectmarker(record);
            }
            if let Some(flow) = &flow_event {
                storage_sink.write_flowrate_entry(&flow.location, flow.entry_rate_per_hour, flow.batch_timestamp);
                storage_sink.write_flowrate_exit(&flow.location, flow.exit_rate_per_hour, flow.batch_timestamp);
            }
        });

        let elapsed = iter_start.elapsed();
        stats.record_iteration(elapsed, batch_len);
        if profile_time {
            tracing::debug!(elapsed_us = elapsed.as_micros(), batch_len, "iteration timing");
        }

        // Suspension point 3: sleep for the remainder of the period.
        if elapsed < resample_period {
            tokio::time::sleep(resample_period - elapsed).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{InMemoryAnomalySink, InMemoryBroker, InMemoryStorageSink};
    use chrono::Utc;
    use track_types::{BoundingBox, Centroid, EventInfo, EventType, ObjectInfo, Place};

    fn rec(sensor: &str, local_id: &str, ts: chrono::DateTime<Utc>) -> DetectionRecord {
        DetectionRecord {
            timestamp: ts,
            sensor_id: sensor.to_string(),
            object: ObjectInfo {
                id: DetectionRecord::normalize_object_id(sensor, local_id),
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
            event: EventInfo::new(EventType::DETECTION),
            place: Place::default(),
            video_path: String::new(),
            start_timestamp: None,
            end_timestamp: None,
            analytics_module: None,
        }
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let mut pipeline = TrackStreamPipeline::new(TrackStreamConfig::default(), Instant::now());
        let out = pipeline.process_batch(Vec::new(), Instant::now());
        assert!(out.emitted.is_empty());
        assert!(out.anomalies.is_empty());
        assert!(out.flow_event.is_none());
    }

    #[test]
    fn one_batch_assigns_synthetic_id_and_dispatches_to_sinks() {
        let mut pipeline = TrackStreamPipeline::new(TrackStreamConfig::default(), Instant::now());
        let t0 = Utc::now();
        let out = pipeline.process_batch(vec![rec("camA", "a1", t0)], Instant::now());
        assert_eq!(out.emitted.len(), 1);
        assert!(out.emitted[0].object.tracker_id.starts_with("UNK-car-"));

        let anomalies = InMemoryAnomalySink::new();
        let storage = InMemoryStorageSink::new();
        pipeline.dispatch(&out, &anomalies, &storage);
        assert_eq!(storage.writes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn run_loop_drains_preloaded_batches_then_stops() {
        let mut broker = InMemoryBroker::new();
        let t0 = Utc::now();
        broker.push_batch(vec![rec("camA", "a1", t0)]);
        broker.push_batch(vec![rec("camA", "a2", t0)]);

        let mut cfg = TrackStreamConfig::default();
        cfg.resample_time_sec = 0.0;
        cfg.input_queue_wait_sec = 0.0;
        let pipeline = TrackStreamPipeline::new(cfg, Instant::now());

        let anomaly_sink: Arc<dyn AnomalySink> = Arc::new(InMemoryAnomalySink::new());
        let storage_sink: Arc<dyn StorageSink> = Arc::new(InMemoryStorageSink::new());
        let mut stats = LoopStats::new();

        let mut iterations = 0;
        run_loop(pipeline, broker, anomaly_sink, storage_sink.clone(), &mut stats, || {
            iterations += 1;
            iterations > 3
        })
        .await;

        // give the fire-and-forget writes a chance to land.
        tokio::task::yield_now().await;
    }
}
