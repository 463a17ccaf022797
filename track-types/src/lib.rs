//! Detection record data model shared by the multi-camera tracker and the
//! state tracker / anomaly engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strand_withkey::WithKey;
use uuid::Uuid;

pub mod geom;

/// Errors produced while turning raw broker/replay bytes into a
/// [`DetectionRecord`]. Schema validation proper is an external collaborator;
/// this only covers "can we even deserialize this JSON".
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("malformed detection record")]
    Json(#[from] serde_json::Error),
}

/// Parse one UTF-8 JSON detection record, as delivered by the broker or the
/// file-replay player.
pub fn parse_detection_record(bytes: &[u8]) -> Result<DetectionRecord, RecordError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// An event-type tag. Kept as a thin string wrapper, not a closed enum,
/// because `others` event types pass through the pipeline unmodified and must
/// round-trip exactly (§4.1).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(pub String);

impl EventType {
    pub const DETECTION: &'static str = "detection";
    pub const DETECTION_ADJ: &'static str = "detection_adj";
    pub const ENTRY: &'static str = "entry";
    pub const EXIT: &'static str = "exit";

    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// `detection ∪ detection_adj`: the "moving-class" records that
    /// participate in clustering and matching (§4.1).
    pub fn is_moving_class(&self) -> bool {
        self.0 == Self::DETECTION || self.0 == Self::DETECTION_ADJ
    }

    pub fn is_detection(&self) -> bool {
        self.0 == Self::DETECTION
    }

    pub fn is_entry(&self) -> bool {
        self.0 == Self::ENTRY
    }

    pub fn is_exit(&self) -> bool {
        self.0 == Self::EXIT
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One sample of a centroid prior to smoothing, kept for audit (§3,
/// `object.centroid.origPoints`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrigPoint {
    pub x: f64,
    pub y: f64,
    pub reason: String,
}

/// World-frame centroid, in meters, in a local flat-earth projection (§9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub x: f64,
    pub y: f64,
    #[serde(
        default,
        rename = "origPoints",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub orig_points: Vec<OrigPoint>,
}

impl Centroid {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            orig_points: Vec::new(),
        }
    }

    pub fn as_point(&self) -> nalgebra::Point2<f64> {
        nalgebra::Point2::new(self.x, self.y)
    }

    /// Append the centroid's current coordinates to its own audit trail,
    /// then overwrite x/y. Used by the MCT-A/MCT-B smoothing steps.
    pub fn smooth_to(&mut self, mean_x: f64, mean_y: f64, reason: &str) {
        self.orig_points.push(OrigPoint {
            x: self.x,
            y: self.y,
            reason: reason.to_string(),
        });
        self.x = mean_x;
        self.y = mean_y;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top_left_x: f64,
    pub top_left_y: f64,
    pub bottom_right_x: f64,
    pub bottom_right_y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub id: String,
    #[serde(default)]
    pub tracker_id: String,
    pub class_id: String,
    pub centroid: Centroid,
    pub bbox: BoundingBox,
    #[serde(default)]
    pub direction: f64,
    #[serde(default)]
    pub orientation: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub id_list: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInfo {
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
}

impl EventInfo {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: EventType::new(event_type),
            id: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subplace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subplace: Subplace,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parking_spot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aisle: Option<String>,
}

impl Place {
    /// `place.name + "-" + (place.subplace.level | "UNKNOWN_LEVEL")`, the
    /// storage-row message id (§6, objectmarker insert).
    pub fn message_id(&self) -> String {
        let level = self.subplace.level.as_deref().unwrap_or("UNKNOWN_LEVEL");
        format!("{}-{}", self.name, level)
    }
}

/// Metadata stamped onto an emitted anomaly event (§4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsModule {
    pub id: String,
    pub description: String,
    pub source: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl AnalyticsModule {
    /// §6 storage egress strips `analyticsModule.confidence` before insert.
    pub fn without_confidence(&self) -> Self {
        Self {
            confidence: None,
            ..self.clone()
        }
    }
}

/// The immutable detection-record message shape (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    #[serde(rename = "@timestamp")]
    pub timestamp: DateTime<Utc>,
    pub sensor_id: String,
    pub object: ObjectInfo,
    pub event: EventInfo,
    #[serde(default)]
    pub place: Place,
    #[serde(default, rename = "videoPath")]
    pub video_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_timestamp: Option<DateTime<Utc>>,
    #[serde(
        default,
        rename = "analyticsModule",
        skip_serializing_if = "Option::is_none"
    )]
    pub analytics_module: Option<AnalyticsModule>,
}

impl DetectionRecord {
    /// `^S<sensor>_^O<local>` (§3).
    pub fn normalize_object_id(sensor_id: &str, local_object_id: &str) -> String {
        format!("^S{sensor_id}_^O{local_object_id}")
    }

    pub fn centroid_point(&self) -> nalgebra::Point2<f64> {
        self.object.centroid.as_point()
    }

    /// Augment this record into an anomaly event per §4.7, step 5: copies
    /// start/end timestamps and rewrites `event`/`analyticsModule`.
    pub fn into_anomaly(
        mut self,
        start_timestamp: DateTime<Utc>,
        emitted_type: &str,
        analytics_module: AnalyticsModule,
    ) -> Self {
        self.start_timestamp = Some(start_timestamp);
        self.end_timestamp = Some(self.timestamp);
        self.event = EventInfo {
            event_type: EventType::new(emitted_type),
            id: Some(Uuid::new_v4()),
        };
        self.analytics_module = Some(analytics_module);
        self
    }

    /// Rewrite this record for the storage egress's `objectmarker` insert:
    /// `@timestamp` renamed to `timestamp`, `analyticsModule.confidence`
    /// stripped (§6).
    pub fn to_storage_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).expect("DetectionRecord always serializes");
        if let Some(obj) = value.as_object_mut() {
            if let Some(ts) = obj.remove("@timestamp") {
                obj.insert("timestamp".to_string(), ts);
            }
            if let Some(am) = obj.get_mut("analyticsModule").and_then(|v| v.as_object_mut()) {
                am.remove("confidence");
            }
        }
        value
    }
}

impl WithKey<DateTime<Utc>> for DetectionRecord {
    fn key(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
