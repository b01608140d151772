//! Plate crop preprocessing and OCR fragment assembly

use crate::plate::{is_vanity_reading, normalize, vanity_lookalikes};
use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use platewatch_core::OcrFragment;

const SHARPEN_KERNEL: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];
const UPSCALE: u32 = 3;

/// Upscale, grayscale and sharpen a plate crop for OCR
pub fn preprocess_plate(crop: &RgbImage) -> GrayImage {
    let (w, h) = crop.dimensions();
    let upscaled = imageops::resize(crop, w * UPSCALE, h * UPSCALE, FilterType::CatmullRom);
    let gray = imageops::grayscale(&upscaled);
    imageops::filter3x3(&gray, &SHARPEN_KERNEL)
}

/// Raw OCR reading of one plate crop, before normalization
#[derive(Debug, Clone, PartialEq)]
pub struct PlateReading {
    pub raw_text: String,
    pub confidence: f32,
}

/// Join the trustworthy fragments left to right.
///
/// Fragments at or below `fragment_min` confidence, or one character long,
/// are dropped. The reading's confidence is the best surviving fragment's
/// and the reading is rejected unless it exceeds `reading_min`.
pub fn assemble_reading(
    fragments: &[OcrFragment],
    fragment_min: f32,
    reading_min: f32,
) -> Option<PlateReading> {
    let mut kept: Vec<&OcrFragment> = fragments
        .iter()
        .filter(|f| f.confidence > fragment_min && f.text.trim().chars().count() > 1)
        .collect();
    if kept.is_empty() {
        return None;
    }
    kept.sort_by(|a, b| a.left_x.total_cmp(&b.left_x));

    let raw_text: String = kept.iter().map(|f| f.text.as_str()).collect();
    let confidence = kept
        .iter()
        .map(|f| f.confidence)
        .fold(f32::MIN, f32::max);

    (confidence > reading_min).then_some(PlateReading { raw_text, confidence })
}

/// Plate text forwarded to stabilization.
///
/// Vanity readings keep their raw shape (with `0`/`1` read as `O`/`I`),
/// everything else goes through [`normalize`].
pub fn emit_reading(raw_text: &str) -> String {
    let upper = raw_text.to_uppercase();
    if is_vanity_reading(&upper) {
        vanity_lookalikes(&upper)
    } else {
        normalize(raw_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_filtered_and_ordered() {
        let fragments = vec![
            OcrFragment::new("1234", 0.8, 40.0),
            OcrFragment::new("WWA", 0.7, 5.0),
            OcrFragment::new("X", 0.99, 80.0),
            OcrFragment::new("ZZ", 0.6, 90.0),
        ];
        let reading = assemble_reading(&fragments, 0.6, 0.4).unwrap();
        assert_eq!(reading.raw_text, "WWA1234");
        assert_eq!(reading.confidence, 0.8);
    }

    #[test]
    fn test_no_surviving_fragments() {
        let fragments = vec![OcrFragment::new("AB", 0.5, 0.0)];
        assert!(assemble_reading(&fragments, 0.6, 0.4).is_none());
        assert!(assemble_reading(&[], 0.6, 0.4).is_none());
    }

    #[test]
    fn test_padded_single_character_dropped() {
        let fragments = vec![
            OcrFragment::new("WWA1234", 0.9, 0.0),
            OcrFragment::new(" 1", 0.9, 40.0),
            OcrFragment::new("7 ", 0.9, 50.0),
        ];
        let reading = assemble_reading(&fragments, 0.6, 0.4).unwrap();
        assert_eq!(reading.raw_text, "WWA1234");
    }

    #[test]
    fn test_reading_threshold() {
        let fragments = vec![OcrFragment::new("AB12", 0.65, 0.0)];
        assert!(assemble_reading(&fragments, 0.6, 0.7).is_none());
        assert!(assemble_reading(&fragments, 0.6, 0.4).is_some());
    }

    #[test]
    fn test_emit_reading_paths() {
        assert_eq!(emit_reading("WWA1234"), "WWA1234");
        assert_eq!(emit_reading("WBC12S4"), "WBC1254S");
        assert_eq!(emit_reading("vip10"), "VIPIO");
        assert_eq!(emit_reading("1M4U8"), "IM4U8");
    }

    #[test]
    fn test_preprocess_dimensions() {
        let crop = RgbImage::from_pixel(20, 8, image::Rgb([200, 200, 200]));
        let processed = preprocess_plate(&crop);
        assert_eq!(processed.dimensions(), (60, 24));
    }
}
