use ndarray::{Array3, Axis, Zip};

use crate::{
    camera::{Calibration, CalibrationType},
    device::{DepthDevice, DriverError},
    error::KinectError,
    image::{image_size, DepthImage, PointCloudImage},
};

/// Per-pixel ray directions of the depth camera.
///
/// Entry (x, y) holds the X and Y of the ray through that pixel at unit
/// depth, so the 3D point of a depth `d` is `(dir_x * d, dir_y * d, d)`.
/// Pixels outside the calibrated field of view hold NaN.
#[derive(Clone, Debug)]
pub struct RayTable {
    /// Shape is (height, width, 2).
    entries: Array3<f32>,
}

impl RayTable {
    /// Asks the camera model for the ray of every depth pixel.
    ///
    /// # Arguments
    ///
    /// * `device` - Driver providing the unprojection.
    /// * `calibration` - Calibration of the device.
    pub fn build<D: DepthDevice + ?Sized>(device: &D, calibration: &Calibration) -> Self {
        let (width, height) = (calibration.depth.width, calibration.depth.height);
        let mut entries = Array3::<f32>::zeros((height, width, 2));

        Zip::indexed(entries.lanes_mut(Axis(2))).par_for_each(|(y, x), mut entry| {
            match device.unproject(
                calibration,
                (x as f32, y as f32),
                1.0,
                CalibrationType::Depth,
                CalibrationType::Depth,
            ) {
                Some(ray) => {
                    entry[0] = ray[0];
                    entry[1] = ray[1];
                }
                None => {
                    entry[0] = f32::NAN;
                    entry[1] = f32::NAN;
                }
            }
        });

        Self { entries }
    }

    /// Creates a table from row-major (dir_x, dir_y) pairs.
    pub fn from_entries(
        width: usize,
        height: usize,
        entries: Vec<[f32; 2]>,
    ) -> Result<Self, KinectError> {
        if entries.len() != width * height {
            return Err(KinectError::invalid_parameter(format!(
                "{} ray entries for a {width}x{height} grid",
                entries.len()
            )));
        }
        let flat = entries.into_iter().flatten().collect::<Vec<f32>>();
        Array3::from_shape_vec((height, width, 2), flat)
            .map(|entries| Self { entries })
            .map_err(|err| KinectError::invalid_parameter(err.to_string()))
    }

    pub fn width(&self) -> usize {
        self.entries.shape()[1]
    }

    pub fn height(&self) -> usize {
        self.entries.shape()[0]
    }

    pub fn len(&self) -> usize {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The ray direction at pixel (x, y), or `None` if the pixel is invalid or out of the grid.
    pub fn get(&self, x: usize, y: usize) -> Option<(f32, f32)> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let (dir_x, dir_y) = (self.entries[[y, x, 0]], self.entries[[y, x, 1]]);
        if dir_x.is_nan() || dir_y.is_nan() {
            None
        } else {
            Some((dir_x, dir_y))
        }
    }

    /// Number of pixels with a valid ray.
    pub fn valid_count(&self) -> usize {
        self.entries
            .lanes(Axis(2))
            .into_iter()
            .filter(|ray| !ray[0].is_nan() && !ray[1].is_nan())
            .count()
    }

    /// Converts a depth image into a point cloud image on the depth grid.
    ///
    /// Pixels with zero depth or without a valid ray are written as `(0, 0, 0)`,
    /// whatever their depth value. So are pixels whose XYZ does not fit in
    /// `i16`, which a depth above 32767 mm always causes.
    pub fn depth_to_point_cloud(
        &self,
        depth: &DepthImage,
        point_cloud: &mut PointCloudImage,
    ) -> Result<(), KinectError> {
        let grid = (self.width(), self.height());
        if image_size(depth) != grid || image_size(point_cloud) != grid {
            return Err(KinectError::Transform(DriverError::new(format!(
                "depth {:?} and point cloud {:?} do not match the {:?} ray table",
                image_size(depth),
                image_size(point_cloud),
                grid
            ))));
        }

        Zip::from(depth)
            .and(point_cloud.lanes_mut(Axis(2)))
            .and(self.entries.lanes(Axis(2)))
            .par_for_each(|z, mut point, ray| {
                let z = *z as f32;
                match to_i16_point(ray[0] * z, ray[1] * z, z) {
                    Some(xyz) if z > 0.0 => {
                        point[0] = xyz[0];
                        point[1] = xyz[1];
                        point[2] = xyz[2];
                    }
                    _ => point.fill(0),
                }
            });
        Ok(())
    }
}

/// Rounds a point to the driver's integer millimeters, `None` if it does not
/// fit. NaN coordinates never fit.
pub(crate) fn to_i16_point(x: f32, y: f32, z: f32) -> Option<[i16; 3]> {
    let range = i16::MIN as f32..=i16::MAX as f32;
    let (x, y, z) = (x.round(), y.round(), z.round());
    if range.contains(&x) && range.contains(&y) && range.contains(&z) {
        Some([x as i16, y as i16, z as i16])
    } else {
        None
    }
}
