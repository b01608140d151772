pub mod types;
pub mod error;
pub mod record;

pub use error::{Error, Result};
pub use types::{BoundingBox, Detection, DetectionClass, OcrFragment};
pub use record::{DetectionRecord, Scope, TIMESTAMP_FORMAT, MANUAL_CORRECTION_NOTE};
