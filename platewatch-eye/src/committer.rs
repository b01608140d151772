//! Record committer: the state-mutating boundary of the pipeline
//!
//! Every commit has up to three independent side effects: a row in the
//! local backup log, a captured image, and an upsert in the detection
//! store. A failure in one never prevents the others and is never raised
//! to the frame loop; it is logged and reported on the outcome.

use chrono::NaiveDateTime;
use image::RgbImage;
use platewatch_core::{DetectionRecord, Scope, TIMESTAMP_FORMAT};
use platewatch_storage::{BackupLog, BackupRow, DetectionStore, ImageArchive};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What happened to each side effect of one commit
#[derive(Debug, Clone, PartialEq)]
pub struct CommitOutcome {
    pub record: DetectionRecord,
    pub backup_ok: bool,
    pub remote_ok: bool,
    pub image_path: Option<PathBuf>,
}

/// Writes records for one user/camera scope
pub struct RecordCommitter {
    scope: Scope,
    store: Arc<dyn DetectionStore>,
    backup: Arc<BackupLog>,
    images: Option<Arc<ImageArchive>>,
}

impl RecordCommitter {
    pub fn new(
        scope: Scope,
        store: Arc<dyn DetectionStore>,
        backup: Arc<BackupLog>,
        images: Option<Arc<ImageArchive>>,
    ) -> Self {
        Self {
            scope,
            store,
            backup,
            images,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn store(&self) -> &Arc<dyn DetectionStore> {
        &self.store
    }

    pub fn backup(&self) -> &Arc<BackupLog> {
        &self.backup
    }

    /// Commit one record. `note` is empty for automated commits.
    #[allow(clippy::too_many_arguments)]
    pub async fn commit(
        &self,
        at: NaiveDateTime,
        plate: &str,
        confidence: f64,
        color: &str,
        distance_m: f64,
        height_m: f64,
        note: &str,
        image: Option<&RgbImage>,
    ) -> CommitOutcome {
        let record = DetectionRecord::new(
            plate,
            at,
            self.scope.camera_source.clone(),
            confidence,
            color,
            distance_m,
            height_m,
            note,
        );

        let row = BackupRow::committed(
            at.format(TIMESTAMP_FORMAT).to_string(),
            plate,
            confidence,
            color,
            distance_m,
            height_m,
            note,
        );
        let backup_ok = self.append_backup(&row);

        let image_path = match (image, &self.images) {
            (Some(frame), Some(archive)) => match archive.save(plate, at, frame) {
                Ok(path) => {
                    debug!("Saved capture {:?}", path);
                    Some(path)
                }
                Err(e) => {
                    warn!("Failed to save capture for {}: {}", plate, e);
                    None
                }
            },
            _ => None,
        };

        let remote_ok = self.put_remote(&record).await;

        info!(
            "Committed {} ({:.2}, {}, {:.2}m) for {}",
            plate, record.confidence, color, record.distance_m, self.scope.camera_source
        );

        CommitOutcome {
            record,
            backup_ok,
            remote_ok,
            image_path,
        }
    }

    /// Append a row to the local log, logging failures
    pub(crate) fn append_backup(&self, row: &BackupRow) -> bool {
        match self.backup.append(row) {
            Ok(()) => true,
            Err(e) => {
                error!("Backup log write failed for {}: {}", row.plate, e);
                false
            }
        }
    }

    /// Upsert into the detection store, logging failures
    pub(crate) async fn put_remote(&self, record: &DetectionRecord) -> bool {
        match self.store.put(&self.scope, record.key(), record).await {
            Ok(()) => true,
            Err(e) => {
                error!("Store write failed for {}: {}", record.plate_number, e);
                false
            }
        }
    }

    /// Delete from the detection store, logging failures
    pub(crate) async fn delete_remote(&self, key: &str) -> bool {
        match self.store.delete(&self.scope, key).await {
            Ok(()) => true,
            Err(e) => {
                error!("Store delete failed for {}: {}", key, e);
                false
            }
        }
    }
}
