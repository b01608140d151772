//! Persisted vehicle-sighting records

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Format used for record timestamps and backup-log rows
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Note attached to records written by an operator correction
pub const MANUAL_CORRECTION_NOTE: &str = "Manually Corrected";

/// Persistence scope of a detection log: one user, one camera source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Scope {
    pub user_id: String,
    pub camera_source: String,
}

impl Scope {
    pub fn new(user_id: impl Into<String>, camera_source: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            camera_source: camera_source.into(),
        }
    }
}

/// The persisted unit, keyed by `plate_number` within a [`Scope`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub plate_number: String,
    pub timestamp: String,
    pub camera_source: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    pub color: String,
    pub distance_m: f64,
    pub height_m: f64,
    #[serde(default)]
    pub note: String,
}

impl DetectionRecord {
    /// Build a record, rounding the metrics to two decimals.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        plate_number: impl Into<String>,
        timestamp: NaiveDateTime,
        camera_source: impl Into<String>,
        confidence: f64,
        color: impl Into<String>,
        distance_m: f64,
        height_m: f64,
        note: impl Into<String>,
    ) -> Self {
        Self {
            plate_number: plate_number.into(),
            timestamp: timestamp.format(TIMESTAMP_FORMAT).to_string(),
            camera_source: camera_source.into(),
            confidence: round2(confidence),
            color: color.into(),
            distance_m: round2(distance_m),
            height_m: round2(height_m),
            note: note.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.plate_number
    }

    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT).ok()
    }
}

fn default_confidence() -> f64 {
    1.0
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
