//! Operator corrections of the last committed plate
//!
//! A correction supersedes the previous automated record: the old key is
//! deleted and the corrected plate written in its place, so the store never
//! holds both the misread and the corrected plate for one sighting.

use crate::committer::RecordCommitter;
use crate::error::VisionError;
use crate::pipeline::VehicleMeasurement;
use crate::processing::CooldownState;
use chrono::NaiveDateTime;
use platewatch_core::{DetectionRecord, Error as CoreError, MANUAL_CORRECTION_NOTE, TIMESTAMP_FORMAT};
use platewatch_storage::BackupRow;
use tracing::{info, warn};

/// Color written to the backup log when no vehicle color is known yet
pub const MANUAL_COLOR_FALLBACK: &str = "Manual_Color";

/// Result of one operator correction
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideOutcome {
    pub record: DetectionRecord,
    /// Key of the record that was removed from the store, if any
    pub superseded: Option<String>,
    pub remote_ok: bool,
    pub backup_ok: bool,
}

/// Uppercase and drop spaces
pub fn clean_manual_plate(input: &str) -> String {
    input.to_uppercase().chars().filter(|c| !c.is_whitespace()).collect()
}

/// Replace the last committed record with `corrected_plate`.
///
/// Trusted input: no buffer or cooldown gating. The record carries
/// confidence 1.0 and the manual-correction note; the last-committed key
/// moves to the corrected plate so a second correction targets it.
pub(crate) async fn apply_override(
    committer: &RecordCommitter,
    cooldown: &mut CooldownState,
    measurement: &VehicleMeasurement,
    corrected_plate: &str,
    at: NaiveDateTime,
) -> Result<OverrideOutcome, VisionError> {
    let plate = clean_manual_plate(corrected_plate);
    if plate.is_empty() {
        return Err(CoreError::Validation("Corrected plate cannot be empty".to_string()).into());
    }

    let previous_key = cooldown.last_committed_key.clone();
    let prior_removed = match &previous_key {
        Some(previous) => committer.delete_remote(previous).await,
        None => {
            warn!("No committed record to supersede, writing {} as a new record", plate);
            true
        }
    };

    let record = DetectionRecord::new(
        plate.clone(),
        at,
        committer.scope().camera_source.clone(),
        1.0,
        measurement.color.clone(),
        measurement.distance_m,
        measurement.height_m,
        MANUAL_CORRECTION_NOTE,
    );
    // The prior key stays tracked until it is gone, so the store never holds both plates
    let remote_ok = if prior_removed {
        committer.put_remote(&record).await
    } else {
        warn!(
            "Could not remove {:?}, corrected plate {} kept in local log only",
            previous_key, plate
        );
        false
    };

    let color = if measurement.is_color_known() {
        measurement.color.as_str()
    } else {
        MANUAL_COLOR_FALLBACK
    };
    let row = BackupRow::manual(
        at.format(TIMESTAMP_FORMAT).to_string(),
        plate.clone(),
        color,
        measurement.distance_m,
        measurement.height_m,
    );
    let backup_ok = committer.append_backup(&row);

    if prior_removed {
        cooldown.replace_key(plate.clone());
    }
    info!(
        "Manual correction {} -> {} on {}",
        previous_key.as_deref().unwrap_or("-"),
        plate,
        committer.scope().camera_source
    );

    Ok(OverrideOutcome {
        record,
        superseded: previous_key.filter(|_| prior_removed),
        remote_ok,
        backup_ok,
    })
}
