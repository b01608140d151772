//! Pinhole-camera distance and size estimation

/// Estimated distance to a vehicle and its real-world height
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleGeometry {
    pub distance_m: f64,
    pub height_m: f64,
}

/// Estimate `(distance_m, height_m)` from a box size in pixels.
///
/// A zero-width box yields `(0.0, 0.0)`.
pub fn estimate_distance_and_size(
    box_width: f64,
    box_height: f64,
    known_width_m: f64,
    focal_length_px: f64,
) -> VehicleGeometry {
    if box_width == 0.0 {
        return VehicleGeometry::default();
    }
    let distance_m = (known_width_m * focal_length_px) / box_width;
    let height_m = (box_height * distance_m) / focal_length_px;
    VehicleGeometry { distance_m, height_m }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_width_box() {
        let g = estimate_distance_and_size(0.0, 120.0, 1.8, 500.0);
        assert_eq!(g, VehicleGeometry { distance_m: 0.0, height_m: 0.0 });
    }

    #[test]
    fn test_distance_formula() {
        let g = estimate_distance_and_size(90.0, 60.0, 1.8, 500.0);
        assert!((g.distance_m - 10.0).abs() < 1e-9);
        assert!((g.height_m - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_distance_shrinks_with_wider_box() {
        let near = estimate_distance_and_size(300.0, 100.0, 1.8, 500.0);
        let far = estimate_distance_and_size(60.0, 20.0, 1.8, 500.0);
        assert!(near.distance_m < far.distance_m);
        assert!((far.distance_m - 15.0).abs() < 1e-9);
    }
}
