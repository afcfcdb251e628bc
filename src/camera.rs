use nalgebra::Vector3;

use super::transform::Transform;

/// Camera intrinsic parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraIntrinsics {
    /// Focal length and pixel scale in the X-axis.
    pub fx: f64,
    /// Focal length and pixel scale in the Y-axis.
    pub fy: f64,
    /// Camera X-center.
    pub cx: f64,
    /// Camera Y-center.
    pub cy: f64,
}

impl CameraIntrinsics {
    pub fn from_simple_intrinsic(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Project a 3D point into image space.
    ///
    /// # Arguments
    ///
    /// * point: The 3D point.
    ///
    /// # Returns
    ///
    /// * (x and y) coordinates.
    pub fn project(&self, point: &Vector3<f32>) -> (f32, f32) {
        (
            point[0] * self.fx as f32 / point[2] + self.cx as f32,
            point[1] * self.fy as f32 / point[2] + self.cy as f32,
        )
    }

    pub fn backproject(&self, x: f32, y: f32, z: f32) -> Vector3<f32> {
        Vector3::new(
            (x - self.cx as f32) * z / self.fx as f32,
            (y - self.cy as f32) * z / self.fy as f32,
            z,
        )
    }
}

/// Which sensor of the device a pixel or a point is expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationType {
    Depth,
    Color,
}

/// Intrinsics of one sensor together with its image size.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraCalibration {
    pub intrinsics: CameraIntrinsics,
    pub width: usize,
    pub height: usize,
}

impl CameraCalibration {
    pub fn new(intrinsics: CameraIntrinsics, width: usize, height: usize) -> Self {
        Self {
            intrinsics,
            width,
            height,
        }
    }

    /// Pinhole camera with the principal point at the image center and the
    /// given horizontal field of view, in degrees.
    pub fn from_fov(width: usize, height: usize, hfov_degrees: f64) -> Self {
        let f = width as f64 / (2.0 * (0.5 * hfov_degrees.to_radians()).tan());
        Self::new(
            CameraIntrinsics::from_simple_intrinsic(
                f,
                f,
                (width as f64 - 1.0) * 0.5,
                (height as f64 - 1.0) * 0.5,
            ),
            width,
            height,
        )
    }

    /// Whether the (x, y) image coordinate falls inside the sensor.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.width as f32 && y < self.height as f32
    }
}

/// Camera model of the device, fixed for its lifetime.
#[derive(Clone, Debug, PartialEq)]
pub struct Calibration {
    pub depth: CameraCalibration,
    pub color: CameraCalibration,
    /// Moves points from the depth camera frame into the color camera frame.
    pub depth_to_color: Transform,
}

impl Calibration {
    pub fn new(depth: CameraCalibration, color: CameraCalibration, depth_to_color: Transform) -> Self {
        Self {
            depth,
            color,
            depth_to_color,
        }
    }

    pub fn camera(&self, camera: CalibrationType) -> &CameraCalibration {
        match camera {
            CalibrationType::Depth => &self.depth,
            CalibrationType::Color => &self.color,
        }
    }

    /// Transform taking points from the `source` camera frame to the `target` one.
    pub fn extrinsics(&self, source: CalibrationType, target: CalibrationType) -> Transform {
        match (source, target) {
            (CalibrationType::Depth, CalibrationType::Color) => self.depth_to_color.clone(),
            (CalibrationType::Color, CalibrationType::Depth) => self.depth_to_color.inverse(),
            _ => Transform::eye(),
        }
    }
}
