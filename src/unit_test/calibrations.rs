use nalgebra::Vector3;
use rstest::fixture;

use crate::{
    camera::{Calibration, CameraCalibration},
    transform::Transform,
};

/// 4x4 depth and 8x8 color grids, both 90 degrees wide, sharing the same origin.
#[fixture]
pub fn identity_calibration() -> Calibration {
    Calibration::new(
        CameraCalibration::from_fov(4, 4, 90.0),
        CameraCalibration::from_fov(8, 8, 90.0),
        Transform::eye(),
    )
}

/// Small sensor pair with a color camera slightly shifted and rotated.
#[fixture]
pub fn sample_calibration() -> Calibration {
    Calibration::new(
        CameraCalibration::from_fov(32, 24, 75.0),
        CameraCalibration::from_fov(64, 36, 90.0),
        Transform::new(Vector3::new(-32.0, -2.0, 4.0), Vector3::y() * 0.05),
    )
}
