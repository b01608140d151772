//! External model collaborators
//!
//! The detector, color classifier and OCR engine are black boxes to the
//! pipeline. Each is reached through a trait so that any inference backend
//! (or the scripted [`replay`] implementation) can be plugged in.

pub mod replay;

use crate::error::VisionError;
use crate::frame::Frame;
use image::{GrayImage, RgbImage};
use platewatch_core::{BoundingBox, Detection, OcrFragment};
use std::sync::Arc;

pub use replay::{ReplayCollaborators, ReplayScript};

/// Vehicle region cut out of a frame for color classification
#[derive(Debug, Clone)]
pub struct VehicleCrop {
    pub frame_index: u64,
    pub region: BoundingBox,
    pub image: RgbImage,
}

/// Preprocessed plate region handed to the OCR engine
#[derive(Debug, Clone)]
pub struct PlateCrop {
    pub frame_index: u64,
    pub region: BoundingBox,
    pub image: GrayImage,
}

/// Vehicle and plate detector. Stateless across calls.
pub trait Detector: Send + Sync {
    fn detect(&self, frame: &Frame, confidence_threshold: f32) -> Result<Vec<Detection>, VisionError>;
}

/// Vehicle color classifier; returns a color label.
pub trait ColorClassifier: Send + Sync {
    fn classify(&self, crop: &VehicleCrop, confidence_threshold: f32) -> Result<String, VisionError>;
}

/// Plate OCR engine; returns text fragments with confidence and position.
pub trait OcrEngine: Send + Sync {
    fn read(&self, crop: &PlateCrop, allowed_characters: &str) -> Result<Vec<OcrFragment>, VisionError>;
}

/// The three model collaborators of one pipeline
#[derive(Clone)]
pub struct Collaborators {
    pub detector: Arc<dyn Detector>,
    pub classifier: Arc<dyn ColorClassifier>,
    pub ocr: Arc<dyn OcrEngine>,
}

impl Collaborators {
    pub fn new(
        detector: Arc<dyn Detector>,
        classifier: Arc<dyn ColorClassifier>,
        ocr: Arc<dyn OcrEngine>,
    ) -> Self {
        Self {
            detector,
            classifier,
            ocr,
        }
    }

    /// All three roles answered by one replay script
    pub fn replay(replay: ReplayCollaborators) -> Self {
        let shared = Arc::new(replay);
        Self {
            detector: shared.clone(),
            classifier: shared.clone(),
            ocr: shared,
        }
    }
}
