use std::time::Duration;

use crate::{
    device::{CaptureGuard, DepthDevice, WaitResult},
    error::KinectError,
};

/// Waits for one synchronized depth and color capture.
///
/// The returned guard holds both images and hands them back to the driver
/// when dropped. A capture missing either image is released before the error
/// is returned.
///
/// # Errors
///
/// * `CaptureTimeout` - Nothing arrived within `timeout`, the caller may retry.
/// * `CaptureFailed` - The driver failed to read the capture.
/// * `MissingImage` - The capture lacks its depth or color image.
pub fn capture<D: DepthDevice + ?Sized>(
    device: &D,
    timeout: Duration,
) -> Result<CaptureGuard<'_, D>, KinectError> {
    match device.get_capture(timeout) {
        WaitResult::Succeeded(capture) => {
            let guard = CaptureGuard::new(device, capture);
            guard.depth()?;
            guard.color()?;
            Ok(guard)
        }
        WaitResult::Timeout => Err(KinectError::CaptureTimeout),
        WaitResult::Failed(err) => Err(KinectError::CaptureFailed(err)),
    }
}
