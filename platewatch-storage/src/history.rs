//! Record history and administrative edits

use crate::store::DetectionStore;
use platewatch_core::{DetectionRecord, Error, Result, Scope};
use regex::Regex;
use std::sync::OnceLock;
use tracing::info;

/// Records of `user_id`, newest first, optionally restricted to one camera.
pub async fn history(
    store: &dyn DetectionStore,
    user_id: &str,
    camera_source: Option<&str>,
) -> Result<Vec<(Scope, DetectionRecord)>> {
    let mut records = store.list_user(user_id).await?;
    if let Some(camera) = camera_source {
        records.retain(|(scope, _)| scope.camera_source == camera);
    }
    // Timestamps are zero-padded, so lexical order is chronological
    records.sort_by(|(_, a), (_, b)| b.timestamp.cmp(&a.timestamp));
    Ok(records)
}

/// Field values submitted by an administrator for an existing record
#[derive(Debug, Clone, Default)]
pub struct RecordEdit {
    pub plate_number: String,
    pub color: String,
    pub distance_m: String,
    pub height_m: String,
    pub timestamp: String,
    pub note: String,
}

impl RecordEdit {
    /// Prefill from an existing record
    pub fn from_record(record: &DetectionRecord) -> Self {
        Self {
            plate_number: record.plate_number.clone(),
            color: record.color.clone(),
            distance_m: format!("{}", record.distance_m),
            height_m: format!("{}", record.height_m),
            timestamp: record.timestamp.clone(),
            note: record.note.clone(),
        }
    }
}

fn decimal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+(\.\d{1,2})?$").expect("valid decimal pattern"))
}

/// Non-negative number with at most two fractional digits
pub fn is_valid_decimal(value: &str) -> bool {
    decimal_pattern().is_match(value) && value.parse::<f64>().is_ok()
}

/// Apply an edit to the record stored under `old_plate`.
///
/// A changed plate moves the record: the old key is deleted and the new
/// key written. Confidence is carried over from the stored record.
pub async fn edit_record(
    store: &dyn DetectionStore,
    scope: &Scope,
    old_plate: &str,
    edit: RecordEdit,
) -> Result<DetectionRecord> {
    let new_plate: String = edit
        .plate_number
        .trim()
        .to_uppercase()
        .chars()
        .filter(|c| *c != ' ')
        .collect();
    let color = edit.color.trim().to_string();
    let distance = edit.distance_m.trim().to_string();
    let height = edit.height_m.trim().to_string();
    let timestamp = edit.timestamp.trim().to_string();
    let note = edit.note.trim().to_string();

    if [&new_plate, &color, &distance, &height, &timestamp]
        .iter()
        .any(|f| f.is_empty())
    {
        return Err(Error::Validation("All fields except note are required".to_string()));
    }
    if !is_valid_decimal(&distance) || !is_valid_decimal(&height) {
        return Err(Error::Validation(
            "Distance/Height must be numbers (max 2 decimals)".to_string(),
        ));
    }

    let existing = store
        .get(scope, old_plate)
        .await?
        .ok_or_else(|| Error::NotFound(old_plate.to_string()))?;

    let updated = DetectionRecord {
        plate_number: new_plate.clone(),
        timestamp,
        camera_source: existing.camera_source.clone(),
        confidence: existing.confidence,
        color,
        distance_m: distance
            .parse()
            .map_err(|_| Error::Validation(format!("Invalid distance: {}", distance)))?,
        height_m: height
            .parse()
            .map_err(|_| Error::Validation(format!("Invalid height: {}", height)))?,
        note,
    };

    if new_plate != old_plate {
        store.delete(scope, old_plate).await?;
        info!("Record {} renamed to {}", old_plate, new_plate);
    }
    store.put(scope, &new_plate, &updated).await?;
    Ok(updated)
}
