//! Frames flowing through the pipeline

use image::imageops::{self, FilterType};
use image::RgbImage;
use platewatch_core::BoundingBox;

/// One decoded image plus its position in the stream
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Resize in place unless already `size`
    pub fn resize_to(&mut self, size: (u32, u32)) {
        if self.image.dimensions() != size {
            self.image = imageops::resize(&self.image, size.0, size.1, FilterType::Triangle);
        }
    }

    /// Copy out the pixels under `region`, clamped to the frame.
    pub fn crop(&self, region: &BoundingBox) -> Option<RgbImage> {
        let clamped = region.clamp_to(self.width(), self.height())?;
        let view = imageops::crop_imm(
            &self.image,
            clamped.x1 as u32,
            clamped.y1 as u32,
            clamped.width() as u32,
            clamped.height() as u32,
        );
        Some(view.to_image())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_clamps_region() {
        let frame = Frame::new(1, RgbImage::new(100, 50));
        let crop = frame.crop(&BoundingBox::new(90, 40, 120, 80)).unwrap();
        assert_eq!(crop.dimensions(), (10, 10));
        assert!(frame.crop(&BoundingBox::new(200, 0, 220, 10)).is_none());
    }

    #[test]
    fn test_resize_to() {
        let mut frame = Frame::new(1, RgbImage::new(320, 240));
        frame.resize_to((640, 640));
        assert_eq!(frame.image.dimensions(), (640, 640));
    }
}
