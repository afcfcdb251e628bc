use crate::{
    camera::Calibration,
    config::{ColorResolution, DepthMode, SessionConfig},
    device::{DepthDevice, SyntheticDevice},
};

/// A calibrated and streaming synthetic device that delivers incomplete
/// captures too.
pub fn started_device(calibration: Calibration) -> SyntheticDevice {
    let device = SyntheticDevice::with_calibration(calibration);
    device
        .calibration(DepthMode::NfovUnbinned, ColorResolution::R720p)
        .unwrap();
    device
        .start_cameras(&SessionConfig::default().synchronized_images_only(false))
        .unwrap();
    device
}
