//! Configuration for the detection-to-record pipeline

use crate::error::VisionError;
use crate::processing::TriggerZone;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Every tunable of one camera pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Reference vehicle width in meters
    pub known_width_m: f64,
    /// Calibrated focal length in pixels
    pub focal_length_px: f64,
    /// Position of the trigger line as a fraction of frame height
    pub trigger_ratio: f64,
    /// Half-height of the acceptance band around the trigger line
    pub trigger_band_px: i32,
    /// Detector and color-classifier confidence threshold
    pub confidence_threshold: f32,
    /// Overlay opacity of the trigger line (display only)
    pub line_opacity: f32,
    /// Full inference runs on every `sample_stride`-th frame
    pub sample_stride: u64,
    pub buffer_capacity: usize,
    /// Votes needed within a full buffer to stabilize a plate
    pub majority_count: usize,
    pub cooldown_seconds: u64,
    /// Vehicles narrower than this are not color-classified
    pub min_color_box_width_px: i32,
    pub fragment_min_confidence: f32,
    pub reading_min_confidence: f32,
    pub allowed_characters: String,
    /// Frames are resized to this size before processing
    pub frame_size: Option<(u32, u32)>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            known_width_m: 1.8,
            focal_length_px: 500.0,
            trigger_ratio: 0.75,
            trigger_band_px: 100,
            confidence_threshold: 0.50,
            line_opacity: 0.5,
            sample_stride: 5,
            buffer_capacity: 5,
            majority_count: 3,
            cooldown_seconds: 15,
            min_color_box_width_px: 50,
            fragment_min_confidence: 0.6,
            reading_min_confidence: 0.4,
            allowed_characters: "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ".to_string(),
            frame_size: Some((640, 640)),
        }
    }
}

impl PipelineConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.known_width_m > 0.0) || !self.known_width_m.is_finite() {
            return Err("Known width must be a positive number".to_string());
        }
        if !(self.focal_length_px > 0.0) || !self.focal_length_px.is_finite() {
            return Err("Focal length must be a positive number".to_string());
        }
        if !(0.1..=0.9).contains(&self.trigger_ratio) {
            return Err("Trigger ratio must be between 0.1 and 0.9".to_string());
        }
        if self.trigger_band_px <= 0 {
            return Err("Trigger band must be positive".to_string());
        }
        if !(0.3..=0.95).contains(&self.confidence_threshold) {
            return Err("Confidence threshold must be between 0.3 and 0.95".to_string());
        }
        if !(0.0..=1.0).contains(&self.line_opacity) {
            return Err("Line opacity must be between 0 and 1".to_string());
        }
        if self.sample_stride == 0 {
            return Err("Sample stride must be at least 1".to_string());
        }
        if self.buffer_capacity == 0 {
            return Err("Buffer capacity must be at least 1".to_string());
        }
        if self.majority_count == 0 || self.majority_count > self.buffer_capacity {
            return Err("Majority count must be between 1 and the buffer capacity".to_string());
        }
        if !(0.0..=1.0).contains(&self.fragment_min_confidence)
            || !(0.0..=1.0).contains(&self.reading_min_confidence)
        {
            return Err("OCR confidence thresholds must be between 0 and 1".to_string());
        }
        if self.allowed_characters.is_empty() {
            return Err("Allowed OCR characters cannot be empty".to_string());
        }
        if let Some((w, h)) = self.frame_size {
            if w == 0 || h == 0 {
                return Err("Frame size must be non-zero".to_string());
            }
        }
        Ok(())
    }

    /// Trigger zone for a frame of `frame_height`
    pub fn trigger_zone(&self, frame_height: u32) -> TriggerZone {
        TriggerZone::new(frame_height, self.trigger_ratio, self.trigger_band_px)
    }

    /// Load configuration from a JSON, TOML or YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, VisionError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_str(&content)
    }

    /// Parse configuration, trying JSON, then TOML, then YAML
    pub fn from_str(content: &str) -> Result<Self, VisionError> {
        let config = if let Ok(config) = serde_json::from_str::<PipelineConfig>(content) {
            config
        } else if let Ok(config) = toml::from_str::<PipelineConfig>(content) {
            config
        } else if let Ok(config) = serde_yaml::from_str::<PipelineConfig>(content) {
            config
        } else {
            return Err(VisionError::Config("Unknown configuration format".to_string()));
        };
        config.validate().map_err(VisionError::Config)?;
        Ok(config)
    }

    /// Defaults overlaid with `PLATEWATCH_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_parse::<f64>("PLATEWATCH_TRIGGER_RATIO") {
            config.trigger_ratio = v;
        }
        if let Some(v) = env_parse::<f32>("PLATEWATCH_CONFIDENCE_THRESHOLD") {
            config.confidence_threshold = v;
        }
        if let Some(v) = env_parse::<f64>("PLATEWATCH_FOCAL_LENGTH") {
            config.focal_length_px = v;
        }
        if let Some(v) = env_parse::<u64>("PLATEWATCH_COOLDOWN_SECONDS") {
            config.cooldown_seconds = v;
        }

        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.known_width_m, 1.8);
        assert_eq!(config.focal_length_px, 500.0);
        assert_eq!(config.trigger_ratio, 0.75);
        assert_eq!(config.sample_stride, 5);
        assert_eq!(config.buffer_capacity, 5);
        assert_eq!(config.majority_count, 3);
        assert_eq!(config.cooldown_seconds, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_trigger_zone() {
        let config = PipelineConfig::default();
        assert_eq!(config.trigger_zone(640), TriggerZone { line_y: 480, band_px: 100 });
        assert_eq!(config.trigger_zone(481).line_y, 361);
    }

    #[test]
    fn test_validation_trigger_ratio() {
        let mut config = PipelineConfig::default();
        config.trigger_ratio = 0.0;
        assert!(config.validate().is_err());
        config.trigger_ratio = 0.95;
        assert!(config.validate().is_err());
        config.trigger_ratio = 0.1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_majority() {
        let mut config = PipelineConfig::default();
        config.majority_count = 6;
        assert!(config.validate().is_err());
        config.majority_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_focal_length_nan() {
        let mut config = PipelineConfig::default();
        config.focal_length_px = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_frame_size() {
        let mut config = PipelineConfig::default();
        config.frame_size = Some((0, 640));
        assert!(config.validate().is_err());
        config.frame_size = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_str_formats() {
        let json = r#"{"trigger_ratio": 0.6, "cooldown_seconds": 30}"#;
        let config = PipelineConfig::from_str(json).unwrap();
        assert_eq!(config.trigger_ratio, 0.6);
        assert_eq!(config.cooldown_seconds, 30);
        assert_eq!(config.sample_stride, 5);

        let toml = "focal_length_px = 720.0\nsample_stride = 3\n";
        let config = PipelineConfig::from_str(toml).unwrap();
        assert_eq!(config.focal_length_px, 720.0);
        assert_eq!(config.sample_stride, 3);

        let yaml = "confidence_threshold: 0.7\nbuffer_capacity: 7\n";
        let config = PipelineConfig::from_str(yaml).unwrap();
        assert_eq!(config.confidence_threshold, 0.7);
        assert_eq!(config.buffer_capacity, 7);
    }

    #[test]
    fn test_from_str_rejects_invalid_values() {
        let err = PipelineConfig::from_str(r#"{"trigger_ratio": 1.5}"#).unwrap_err();
        assert!(matches!(err, VisionError::Config(_)));
    }
}
