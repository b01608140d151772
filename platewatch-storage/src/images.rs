//! Captured-image archive

use chrono::NaiveDateTime;
use image::RgbImage;
use platewatch_core::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const IMAGE_DIR_NAME: &str = "captured_images";

/// Stores frames under `<dir>/captured_images/{plate}_{YYYYMMDD_HHMMSS}.jpg`
pub struct ImageArchive {
    dir: PathBuf,
}

impl ImageArchive {
    pub fn open(backup_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = backup_dir.as_ref().join(IMAGE_DIR_NAME);
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(plate: &str, timestamp: NaiveDateTime) -> String {
        let safe: String = plate
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("{}_{}.jpg", safe, timestamp.format("%Y%m%d_%H%M%S"))
    }

    pub fn save(&self, plate: &str, timestamp: NaiveDateTime, frame: &RgbImage) -> Result<PathBuf> {
        let path = self.dir.join(Self::file_name(plate, timestamp));
        frame
            .save(&path)
            .map_err(|e| Error::Storage(format!("Failed to write image {:?}: {}", path, e)))?;
        debug!("Image saved: {:?}", path);
        Ok(path)
    }
}
