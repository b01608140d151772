//! Per-frame detection types shared across the workspace

use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel coordinates, corners inclusive of `(x1, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// Vertical center, floored like integer pixel math.
    pub fn center_y(&self) -> i32 {
        (self.y1 + self.y2).div_euclid(2)
    }

    /// Clamp to a `width` x `height` image. Returns `None` when nothing is left.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<BoundingBox> {
        let max_x = width as i32;
        let max_y = height as i32;
        let clamped = BoundingBox {
            x1: self.x1.clamp(0, max_x),
            y1: self.y1.clamp(0, max_y),
            x2: self.x2.clamp(0, max_x),
            y2: self.y2.clamp(0, max_y),
        };
        if clamped.width() <= 0 || clamped.height() <= 0 {
            return None;
        }
        Some(clamped)
    }
}

/// Classes emitted by the vehicle/plate detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionClass {
    Vehicle,
    Plate,
}

/// One detector output for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "bbox")]
    pub region: BoundingBox,
    pub class: DetectionClass,
    pub confidence: f32,
}

impl Detection {
    pub fn new(region: BoundingBox, class: DetectionClass, confidence: f32) -> Self {
        Self { region, class, confidence }
    }
}

/// One token returned by the OCR engine for a plate crop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrFragment {
    pub text: String,
    pub confidence: f32,
    pub left_x: f32,
}

impl OcrFragment {
    pub fn new(text: impl Into<String>, confidence: f32, left_x: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
            left_x,
        }
    }
}
