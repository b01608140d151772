//! Error types for platewatch-eye

use platewatch_core::Error as CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Detector error: {0}")]
    Detector(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Color classifier error: {0}")]
    Classifier(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl From<VisionError> for CoreError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::Core(inner) => inner,
            VisionError::Config(msg) => CoreError::Configuration(msg),
            other => CoreError::Storage(format!("Vision error: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vision_error_display() {
        let err = VisionError::Camera("Test error".to_string());
        assert!(err.to_string().contains("Camera error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_vision_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let vision_err: VisionError = io_err.into();
        assert!(matches!(vision_err, VisionError::Io(_)));
    }

    #[test]
    fn test_vision_error_to_core_error() {
        let core_err: CoreError = VisionError::Detector("model missing".to_string()).into();
        match core_err {
            CoreError::Storage(msg) => {
                assert!(msg.contains("Vision error"));
                assert!(msg.contains("model missing"));
            }
            _ => panic!("Expected Storage error"),
        }

        let config_err: CoreError = VisionError::Config("bad ratio".to_string()).into();
        assert!(matches!(config_err, CoreError::Configuration(_)));
    }

    #[test]
    fn test_core_error_round_trip() {
        let vision_err: VisionError = CoreError::NotFound("X".to_string()).into();
        let back: CoreError = vision_err.into();
        assert!(matches!(back, CoreError::NotFound(_)));
    }
}
