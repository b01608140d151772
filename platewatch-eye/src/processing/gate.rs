//! Frame sampling and trigger-zone gating

use platewatch_core::BoundingBox;

/// Full inference runs only on frames whose index is a multiple of `stride`.
pub fn is_sampled(frame_index: u64, stride: u64) -> bool {
    stride <= 1 || frame_index % stride == 0
}

/// Horizontal band around the measurement line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerZone {
    pub line_y: i32,
    pub band_px: i32,
}

impl TriggerZone {
    /// `line_y = round(frame_height * trigger_ratio)`
    pub fn new(frame_height: u32, trigger_ratio: f64, band_px: i32) -> Self {
        Self {
            line_y: (frame_height as f64 * trigger_ratio).round() as i32,
            band_px,
        }
    }

    /// Inclusive `[line_y - band, line_y + band]`
    pub fn contains_y(&self, y: i32) -> bool {
        y >= self.line_y - self.band_px && y <= self.line_y + self.band_px
    }

    /// Whether a plate box is close enough to the line to be read
    pub fn admits(&self, region: &BoundingBox) -> bool {
        self.contains_y(region.center_y())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_stride() {
        let sampled: Vec<u64> = (0..12).filter(|i| is_sampled(*i, 5)).collect();
        assert_eq!(sampled, vec![0, 5, 10]);
        assert!((0..4).all(|i| is_sampled(i, 1)));
    }

    #[test]
    fn test_trigger_zone_band() {
        let zone = TriggerZone::new(640, 0.75, 100);
        assert_eq!(zone.line_y, 480);
        assert!(zone.contains_y(380));
        assert!(zone.contains_y(580));
        assert!(!zone.contains_y(379));
        assert!(!zone.contains_y(630));
    }

    #[test]
    fn test_plate_outside_band_rejected() {
        let zone = TriggerZone::new(640, 0.75, 100);
        // center 630 = line_y + 150
        let plate = BoundingBox::new(100, 620, 200, 640);
        assert!(!zone.admits(&plate));
        let plate = BoundingBox::new(100, 470, 200, 490);
        assert!(zone.admits(&plate));
    }
}
