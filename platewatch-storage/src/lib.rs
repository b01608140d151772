//! platewatch-storage: persistence targets of the detection pipeline
//!
//! Keyed detection-log stores (in-memory and sled-backed), the append-only
//! CSV backup log, the captured-image archive and the record history/edit
//! operations used by operators and administrators.

pub mod store;
pub mod sled_store;
pub mod backup;
pub mod images;
pub mod history;

pub use store::{DetectionStore, MemoryStore};
pub use sled_store::SledStore;
pub use backup::{BackupLog, BackupRow};
pub use images::ImageArchive;
pub use history::{history, edit_record, RecordEdit};
