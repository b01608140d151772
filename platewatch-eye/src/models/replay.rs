//! Scripted collaborators for offline replay
//!
//! A replay script lists, per frame index, what the detector sees and what
//! the OCR engine and color classifier answer for each box. Box coordinates
//! refer to the frame after it has been resized to the configured size.
//!
//! ```json
//! {
//!   "frames": {
//!     "5": { "detections": [
//!       { "class": "vehicle", "bbox": {"x1": 100, "y1": 300, "x2": 190, "y2": 420},
//!         "confidence": 0.9, "color": "Red" },
//!       { "class": "plate", "bbox": {"x1": 120, "y1": 460, "x2": 180, "y2": 490},
//!         "confidence": 0.8, "ocr": [{"text": "WWA1234", "confidence": 0.7, "left_x": 2.0}] }
//!     ] }
//!   }
//! }
//! ```

use super::{ColorClassifier, Detector, OcrEngine, PlateCrop, VehicleCrop};
use crate::error::VisionError;
use crate::frame::Frame;
use platewatch_core::{Detection, OcrFragment};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedDetection {
    #[serde(flatten)]
    pub detection: Detection,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub ocr: Vec<OcrFragment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptedFrame {
    #[serde(default)]
    pub detections: Vec<ScriptedDetection>,
    /// When set, the detector fails on this frame with the given message
    #[serde(default)]
    pub detector_error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayScript {
    #[serde(default)]
    pub frames: HashMap<u64, ScriptedFrame>,
    /// Used for every frame without its own entry
    #[serde(default)]
    pub default: Option<ScriptedFrame>,
}

impl ReplayScript {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, VisionError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, VisionError> {
        serde_json::from_str(content)
            .map_err(|e| VisionError::Config(format!("Invalid replay script: {}", e)))
    }

    pub fn frame(&self, index: u64) -> Option<&ScriptedFrame> {
        self.frames.get(&index).or(self.default.as_ref())
    }

    fn find(&self, index: u64, region: &platewatch_core::BoundingBox) -> Option<&ScriptedDetection> {
        self.frame(index)?
            .detections
            .iter()
            .find(|d| d.detection.region == *region)
    }
}

/// Detector, OCR engine and color classifier answering from one script
#[derive(Debug, Clone)]
pub struct ReplayCollaborators {
    script: Arc<ReplayScript>,
}

impl ReplayCollaborators {
    pub fn new(script: ReplayScript) -> Self {
        Self {
            script: Arc::new(script),
        }
    }

    pub fn script(&self) -> &ReplayScript {
        &self.script
    }
}

impl Detector for ReplayCollaborators {
    fn detect(&self, frame: &Frame, confidence_threshold: f32) -> Result<Vec<Detection>, VisionError> {
        let Some(scripted) = self.script.frame(frame.index) else {
            return Ok(Vec::new());
        };
        if let Some(msg) = &scripted.detector_error {
            return Err(VisionError::Detector(msg.clone()));
        }
        let detections: Vec<Detection> = scripted
            .detections
            .iter()
            .filter(|d| d.detection.confidence >= confidence_threshold)
            .map(|d| d.detection.clone())
            .collect();
        debug!("Replay frame {}: {} detections", frame.index, detections.len());
        Ok(detections)
    }
}

impl ColorClassifier for ReplayCollaborators {
    fn classify(&self, crop: &VehicleCrop, _confidence_threshold: f32) -> Result<String, VisionError> {
        self.script
            .find(crop.frame_index, &crop.region)
            .and_then(|d| d.color.clone())
            .ok_or_else(|| {
                VisionError::Classifier(format!("No scripted color for frame {}", crop.frame_index))
            })
    }
}

impl OcrEngine for ReplayCollaborators {
    fn read(&self, crop: &PlateCrop, allowed_characters: &str) -> Result<Vec<OcrFragment>, VisionError> {
        let fragments = self
            .script
            .find(crop.frame_index, &crop.region)
            .map(|d| d.ocr.clone())
            .unwrap_or_default();
        Ok(fragments
            .into_iter()
            .map(|mut f| {
                f.text.retain(|c| allowed_characters.contains(c));
                f
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbImage};
    use platewatch_core::{BoundingBox, DetectionClass};

    const SCRIPT: &str = r#"{
        "frames": {
            "5": { "detections": [
                { "class": "vehicle", "bbox": {"x1": 0, "y1": 0, "x2": 90, "y2": 60},
                  "confidence": 0.9, "color": "Red" },
                { "class": "plate", "bbox": {"x1": 10, "y1": 470, "x2": 60, "y2": 490},
                  "confidence": 0.8, "ocr": [{"text": "WW-A", "confidence": 0.9, "left_x": 1.0}] }
            ] },
            "10": { "detector_error": "model crashed" }
        }
    }"#;

    #[test]
    fn test_replay_detect_and_fail() {
        let replay = ReplayCollaborators::new(ReplayScript::from_json(SCRIPT).unwrap());
        let frame = Frame::new(5, RgbImage::new(640, 640));
        let detections = replay.detect(&frame, 0.5).unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[1].class, DetectionClass::Plate);

        assert!(replay.detect(&frame, 0.85).unwrap().len() == 1);

        let failing = Frame::new(10, RgbImage::new(640, 640));
        assert!(matches!(replay.detect(&failing, 0.5), Err(VisionError::Detector(_))));

        let unknown = Frame::new(7, RgbImage::new(640, 640));
        assert!(replay.detect(&unknown, 0.5).unwrap().is_empty());
    }

    #[test]
    fn test_replay_color_and_ocr_lookup() {
        let replay = ReplayCollaborators::new(ReplayScript::from_json(SCRIPT).unwrap());
        let vehicle = VehicleCrop {
            frame_index: 5,
            region: BoundingBox::new(0, 0, 90, 60),
            image: RgbImage::new(90, 60),
        };
        assert_eq!(replay.classify(&vehicle, 0.5).unwrap(), "Red");

        let plate = PlateCrop {
            frame_index: 5,
            region: BoundingBox::new(10, 470, 60, 490),
            image: GrayImage::new(150, 60),
        };
        let fragments = replay.read(&plate, "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789").unwrap();
        assert_eq!(fragments[0].text, "WWA");

        let elsewhere = PlateCrop { region: BoundingBox::new(0, 0, 1, 1), ..plate };
        assert!(replay.read(&elsewhere, "A").unwrap().is_empty());
    }

    #[test]
    fn test_default_frame_applies() {
        let script = ReplayScript {
            default: Some(ScriptedFrame::default()),
            ..Default::default()
        };
        assert!(script.frame(123).is_some());
    }
}
