//! Driver boundary.
//!
//! [`DepthDevice`] is the narrow set of primitives the pipeline needs from a
//! depth camera driver: open/calibrate/start, blocking captures and the
//! driver's own camera-model math. Results come back in the driver's terms
//! ([`DriverError`], [`WaitResult`]) and are translated into
//! [`KinectError`](crate::error::KinectError) by the caller.

use std::sync::Arc;
use std::time::Duration;

use nalgebra::Vector3;

use crate::{
    camera::{Calibration, CalibrationType},
    config::{ColorResolution, DepthMode, SessionConfig},
    error::KinectError,
    image::{ColorImage, DepthImage, PointCloudImage},
};

mod synthetic;
pub use synthetic::{flat_wall, SceneFn, ScriptedCapture, SyntheticDevice};

/// Failure reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    pub message: String,
}

impl DriverError {
    pub fn new<T: ToString>(message: T) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DriverError {}

/// Outcome of a blocking driver call.
#[derive(Debug)]
pub enum WaitResult<T> {
    Succeeded(T),
    Timeout,
    Failed(DriverError),
}

/// Driver handle of an acquired capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureId(pub u64);

/// A synchronized capture as handed out by the driver. Either image may be
/// missing. The driver keeps its buffers alive until the id is released.
#[derive(Debug)]
pub struct Capture {
    pub id: CaptureId,
    pub depth: Option<DepthImage>,
    pub color: Option<ColorImage>,
}

/// Primitives of a depth camera driver.
///
/// Implementations are shared between the record thread and the session
/// owner, so every method takes `&self`.
pub trait DepthDevice: Send + Sync {
    /// Number of connected devices.
    fn installed_count(&self) -> u32;

    fn open(&self, index: u32) -> Result<(), DriverError>;

    fn calibration(
        &self,
        depth_mode: DepthMode,
        color_resolution: ColorResolution,
    ) -> Result<Calibration, DriverError>;

    fn start_cameras(&self, config: &SessionConfig) -> Result<(), DriverError>;

    fn stop_cameras(&self);

    fn close(&self);

    /// Blocks until a capture is available or `timeout` elapses.
    fn get_capture(&self, timeout: Duration) -> WaitResult<Capture>;

    /// Hands the capture buffers back to the driver. Releasing an id twice is
    /// a programmer error.
    fn release_capture(&self, id: CaptureId);

    /// Unprojects the `pixel` of the `source` camera at the given depth, in
    /// millimeters, and expresses the point in the `target` camera frame.
    /// Returns `None` when the pixel has no valid ray.
    fn unproject(
        &self,
        calibration: &Calibration,
        pixel: (f32, f32),
        depth: f32,
        source: CalibrationType,
        target: CalibrationType,
    ) -> Option<Vector3<f32>>;

    /// Computes XYZ for every pixel of a depth image laid on the `camera` grid.
    fn depth_image_to_point_cloud(
        &self,
        calibration: &Calibration,
        depth: &DepthImage,
        camera: CalibrationType,
        point_cloud: &mut PointCloudImage,
    ) -> Result<(), DriverError>;

    /// Resamples the color image onto the depth grid.
    fn color_image_to_depth_camera(
        &self,
        calibration: &Calibration,
        depth: &DepthImage,
        color: &ColorImage,
        transformed_color: &mut ColorImage,
    ) -> Result<(), DriverError>;

    /// Resamples the depth image onto the color grid.
    fn depth_image_to_color_camera(
        &self,
        calibration: &Calibration,
        depth: &DepthImage,
        transformed_depth: &mut DepthImage,
    ) -> Result<(), DriverError>;
}

/// Shares one driver between a session and other owners.
impl<D: DepthDevice + ?Sized> DepthDevice for Arc<D> {
    fn installed_count(&self) -> u32 {
        (**self).installed_count()
    }

    fn open(&self, index: u32) -> Result<(), DriverError> {
        (**self).open(index)
    }

    fn calibration(
        &self,
        depth_mode: DepthMode,
        color_resolution: ColorResolution,
    ) -> Result<Calibration, DriverError> {
        (**self).calibration(depth_mode, color_resolution)
    }

    fn start_cameras(&self, config: &SessionConfig) -> Result<(), DriverError> {
        (**self).start_cameras(config)
    }

    fn stop_cameras(&self) {
        (**self).stop_cameras()
    }

    fn close(&self) {
        (**self).close()
    }

    fn get_capture(&self, timeout: Duration) -> WaitResult<Capture> {
        (**self).get_capture(timeout)
    }

    fn release_capture(&self, id: CaptureId) {
        (**self).release_capture(id)
    }

    fn unproject(
        &self,
        calibration: &Calibration,
        pixel: (f32, f32),
        depth: f32,
        source: CalibrationType,
        target: CalibrationType,
    ) -> Option<Vector3<f32>> {
        (**self).unproject(calibration, pixel, depth, source, target)
    }

    fn depth_image_to_point_cloud(
        &self,
        calibration: &Calibration,
        depth: &DepthImage,
        camera: CalibrationType,
        point_cloud: &mut PointCloudImage,
    ) -> Result<(), DriverError> {
        (**self).depth_image_to_point_cloud(calibration, depth, camera, point_cloud)
    }

    fn color_image_to_depth_camera(
        &self,
        calibration: &Calibration,
        depth: &DepthImage,
        color: &ColorImage,
        transformed_color: &mut ColorImage,
    ) -> Result<(), DriverError> {
        (**self).color_image_to_depth_camera(calibration, depth, color, transformed_color)
    }

    fn depth_image_to_color_camera(
        &self,
        calibration: &Calibration,
        depth: &DepthImage,
        transformed_depth: &mut DepthImage,
    ) -> Result<(), DriverError> {
        (**self).depth_image_to_color_camera(calibration, depth, transformed_depth)
    }
}

/// Owns an acquired capture and releases it exactly once when dropped,
/// whichever way the record cycle exits.
pub struct CaptureGuard<'a, D: DepthDevice + ?Sized> {
    device: &'a D,
    capture: Capture,
}

impl<'a, D: DepthDevice + ?Sized> CaptureGuard<'a, D> {
    pub fn new(device: &'a D, capture: Capture) -> Self {
        Self { device, capture }
    }

    pub fn id(&self) -> CaptureId {
        self.capture.id
    }

    pub fn depth(&self) -> Result<&DepthImage, KinectError> {
        self.capture
            .depth
            .as_ref()
            .ok_or(KinectError::MissingImage("depth"))
    }

    pub fn color(&self) -> Result<&ColorImage, KinectError> {
        self.capture
            .color
            .as_ref()
            .ok_or(KinectError::MissingImage("color"))
    }
}

impl<'a, D: DepthDevice + ?Sized> Drop for CaptureGuard<'a, D> {
    fn drop(&mut self) {
        self.device.release_capture(self.capture.id);
    }
}
