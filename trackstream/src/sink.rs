//! External collaborators (§6 "External Interfaces"): the ingress broker,
//! the anomaly egress topic, and the storage sink's prepared statements.
//! Production backends live outside this crate's dependency set; these
//! traits are the seam, with in-memory implementations for tests and the
//! file-replay player.

use chrono::{DateTime, Utc};
use track_types::DetectionRecord;

/// Ingress (§6 "Ingress", §5 suspension point 1). `poll` returns up to
/// `max_records`, waiting at most `timeout`; an empty result means the
/// wait elapsed with nothing available.
pub trait BrokerClient: Send {
    fn poll(&mut self, max_records: usize, timeout: std::time::Duration) -> Vec<DetectionRecord>;
}

/// Egress (anomalies): a message-bus topic carrying enriched Detection
/// Records (§6 "Egress (anomalies)").
pub trait AnomalySink: Send + Sync {
    fn publish(&self, record: &DetectionRecord);
}

/// Egress (storage): the three prepared statements against the
/// wide-column store (§6 "Egress (storage)"). Fire-and-forget; failures
/// are the implementor's responsibility to log, never to propagate (§7
/// "Storage write failure at runtime").
pub trait StorageSink: Send + Sync {
    fn write_objectmarker(&self, record: &DetectionRecord);
    fn write_flowrate_entry(&self, location: &str, rate_per_hour: f64, timestamp: DateTime<Utc>);
    fn write_flowrate_exit(&self, location: &str, rate_per_hour: f64, timestamp: DateTime<Utc>);
}

/// VecDeque-backed broker for tests and single-process demos: pre-load
/// batches with `push_batch`, `poll` drains one per call regardless of
/// `timeout` (no real waiting to simulate).
#[derive(Default)]
pub struct InMemoryBroker {
    batches: std::collections::VecDeque<Vec<DetectionRecord>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_batch(&mut self, batch: Vec<DetectionRecord>) {
        self.batches.push_back(batch);
    }
}

impl BrokerClient for InMemoryBroker {
    fn poll(&mut self, max_records: usize, _timeout: std::time::Duration) -> Vec<DetectionRecord> {
        match self.batches.pop_front() {
            Some(mut batch) => {
                batch.truncate(max_records);
                batch
            }
            None => Vec::new(),
        }
    }
}

/// `Mutex<Vec<_>>`-backed sinks for assertions in tests.
#[derive(Default)]
pub struct InMemoryAnomalySink {
    pub published: std::sync::Mutex<Vec<DetectionRecord>>,
}

impl InMemoryAnomalySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnomalySink for InMemoryAnomalySink {
    fn publish(&self, record: &DetectionRecord) {
        self.published.lock().expect("sink mutex poisoned").push(record.clone());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageWrite {
    ObjectMarker(Box<DetectionRecord>),
    FlowrateEntry { location: String, rate_per_hour: f64, timestamp: DateTime<Utc> },
    FlowrateExit { location: String, rate_per_hour: f64, timestamp: DateTime<Utc> },
}

#[derive(Default)]
pub struct InMemoryStorageSink {
    pub writes: std::sync::Mutex<Vec<StorageWrite>>,
}

impl InMemoryStorageSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageSink for InMemoryStorageSink {
    fn write_objectmarker(&self, record: &DetectionRecord) {
        self.writes
            .lock()
            .expect("sink mutex poisoned")
            .push(StorageWrite::ObjectMarker(Box::new(record.clone())));
    }

    fn write_flowrate_entry(&self, location: &str, rate_per_hour: f64, timestamp: DateTime<Utc>) {
        self.writes.lock().expect("sink mutex poisoned").push(StorageWrite::FlowrateEntry {
            location: location.to_string(),
            rate_per_hour,
            timestamp,
        });
    }

    fn write_flowrate_exit(&self, location: &str, rate_per_hour: f64, timestamp: DateTime<Utc>) {
        self.writes.lock().expect("sink mutex poisoned").push(StorageWrite::FlowrateExit {
            location: location.to_string(),
            rate_per_hour,
            timestamp,
        });
    }
}
