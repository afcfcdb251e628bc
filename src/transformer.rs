use std::borrow::Cow;
use std::str::FromStr;

use ndarray::{Array2, Array3};
use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    camera::{Calibration, CalibrationType},
    device::DepthDevice,
    error::KinectError,
    image::{ColorImage, DepthImage, PointCloudImage, BGRA_CHANNELS},
    ray_table::RayTable,
};

/// Grid the point cloud of a cycle is expressed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformMode {
    /// Color is resampled onto the depth grid.
    DepthSpace,
    /// Depth is resampled onto the color grid.
    ColorSpace,
}

impl TransformMode {
    /// The camera whose grid the output adopts.
    pub fn camera(&self) -> CalibrationType {
        match self {
            TransformMode::DepthSpace => CalibrationType::Depth,
            TransformMode::ColorSpace => CalibrationType::Color,
        }
    }
}

impl FromStr for TransformMode {
    type Err = KinectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "depth" | "depth_space" | "color_to_depth" => Ok(TransformMode::DepthSpace),
            "color" | "color_space" | "depth_to_color" => Ok(TransformMode::ColorSpace),
            other => Err(KinectError::invalid_parameter(format!(
                "unknown transform mode `{other}`, expected `depth` or `color`"
            ))),
        }
    }
}

impl std::fmt::Display for TransformMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TransformMode::DepthSpace => write!(f, "depth"),
            TransformMode::ColorSpace => write!(f, "color"),
        }
    }
}

/// Point cloud and color of one capture on a common grid.
#[derive(Debug)]
pub struct TransformedFrame<'a> {
    pub mode: TransformMode,
    pub point_cloud: PointCloudImage,
    pub color: Cow<'a, ColorImage>,
}

impl<'a> TransformedFrame<'a> {
    /// (width, height) of the common grid.
    pub fn size(&self) -> (usize, usize) {
        let shape = self.point_cloud.shape();
        (shape[1], shape[0])
    }
}

/// Zeroed buffer, or an `Allocation` error if the memory is not available.
fn try_zeros<T: Clone + num::Zero>(len: usize, what: &str) -> Result<Vec<T>, KinectError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|err| KinectError::Allocation(format!("{what} of {len} elements: {err}")))?;
    data.resize(len, T::zero());
    Ok(data)
}

fn allocate_image3<T: Clone + num::Zero>(
    (height, width, channels): (usize, usize, usize),
    what: &str,
) -> Result<Array3<T>, KinectError> {
    let data = try_zeros(height * width * channels, what)?;
    Array3::from_shape_vec((height, width, channels), data)
        .map_err(|err| KinectError::Allocation(err.to_string()))
}

fn allocate_image2<T: Clone + num::Zero>(
    (height, width): (usize, usize),
    what: &str,
) -> Result<Array2<T>, KinectError> {
    let data = try_zeros(height * width, what)?;
    Array2::from_shape_vec((height, width), data)
        .map_err(|err| KinectError::Allocation(err.to_string()))
}

/// Brings a raw capture onto the grid selected by `mode`.
///
/// # Arguments
///
/// * `device` - Driver providing the projections.
/// * `calibration` - Calibration of the device.
/// * `ray_table` - When given, used for depth to XYZ in depth space instead of the driver.
/// * `depth` - Raw depth image, on the depth grid.
/// * `color` - Raw BGRA image, on the color grid.
/// * `mode` - Output grid.
pub fn transform<'a, D: DepthDevice + ?Sized>(
    device: &D,
    calibration: &Calibration,
    ray_table: Option<&RayTable>,
    depth: &DepthImage,
    color: &'a ColorImage,
    mode: TransformMode,
) -> Result<TransformedFrame<'a>, KinectError> {
    let frame = match mode {
        TransformMode::DepthSpace => color_to_depth_space(device, calibration, ray_table, depth, color)?,
        TransformMode::ColorSpace => depth_to_color_space(device, calibration, depth, color)?,
    };
    debug!(%mode, size = ?frame.size(), "frame transformed");
    Ok(frame)
}

fn color_to_depth_space<'a, D: DepthDevice + ?Sized>(
    device: &D,
    calibration: &Calibration,
    ray_table: Option<&RayTable>,
    depth: &DepthImage,
    color: &ColorImage,
) -> Result<TransformedFrame<'a>, KinectError> {
    let (width, height) = (calibration.depth.width, calibration.depth.height);

    let mut point_cloud = allocate_image3::<i16>((height, width, 3), "point cloud image")?;
    match ray_table {
        Some(table) => table.depth_to_point_cloud(depth, &mut point_cloud)?,
        None => device
            .depth_image_to_point_cloud(calibration, depth, CalibrationType::Depth, &mut point_cloud)
            .map_err(KinectError::Transform)?,
    }

    let mut transformed_color =
        allocate_image3::<u8>((height, width, BGRA_CHANNELS), "transformed color image")?;
    device
        .color_image_to_depth_camera(calibration, depth, color, &mut transformed_color)
        .map_err(KinectError::Transform)?;

    Ok(TransformedFrame {
        mode: TransformMode::DepthSpace,
        point_cloud,
        color: Cow::Owned(transformed_color),
    })
}

fn depth_to_color_space<'a, D: DepthDevice + ?Sized>(
    device: &D,
    calibration: &Calibration,
    depth: &DepthImage,
    color: &'a ColorImage,
) -> Result<TransformedFrame<'a>, KinectError> {
    let (width, height) = (calibration.color.width, calibration.color.height);

    let mut transformed_depth = allocate_image2::<u16>((height, width), "transformed depth image")?;
    device
        .depth_image_to_color_camera(calibration, depth, &mut transformed_depth)
        .map_err(KinectError::Transform)?;

    let mut point_cloud = allocate_image3::<i16>((height, width, 3), "point cloud image")?;
    device
        .depth_image_to_point_cloud(
            calibration,
            &transformed_depth,
            CalibrationType::Color,
            &mut point_cloud,
        )
        .map_err(KinectError::Transform)?;

    Ok(TransformedFrame {
        mode: TransformMode::ColorSpace,
        point_cloud,
        color: Cow::Borrowed(color),
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{transform, TransformMode};
    use crate::{
        camera::Calibration,
        device::{flat_wall, SyntheticDevice},
        error::KinectError,
        ray_table::RayTable,
        unit_test::identity_calibration,
    };

    #[rstest]
    fn should_output_on_depth_grid(identity_calibration: Calibration) {
        let device = SyntheticDevice::with_calibration(identity_calibration.clone());
        let (depth, color) = flat_wall(&identity_calibration, 900);

        let frame = transform(&device, &identity_calibration, None, &depth, &color, TransformMode::DepthSpace).unwrap();
        assert_eq!(frame.size(), (4, 4));
        assert_eq!(frame.color.shape(), &[4, 4, 4]);
        assert!(frame.point_cloud.outer_iter().all(|row| row.outer_iter().all(|p| p[2] == 900)));
    }

    #[rstest]
    fn should_match_driver_with_ray_table(identity_calibration: Calibration) {
        let device = SyntheticDevice::with_calibration(identity_calibration.clone());
        let table = RayTable::build(&device, &identity_calibration);
        let (depth, color) = flat_wall(&identity_calibration, 1500);

        let from_driver = transform(&device, &identity_calibration, None, &depth, &color, TransformMode::DepthSpace).unwrap();
        let from_table = transform(&device, &identity_calibration, Some(&table), &depth, &color, TransformMode::DepthSpace).unwrap();
        assert_eq!(from_driver.point_cloud, from_table.point_cloud);
    }

    #[rstest]
    fn should_output_on_color_grid(identity_calibration: Calibration) {
        let device = SyntheticDevice::with_calibration(identity_calibration.clone());
        let (depth, color) = flat_wall(&identity_calibration, 900);

        let frame = transform(&device, &identity_calibration, None, &depth, &color, TransformMode::ColorSpace).unwrap();
        assert_eq!(frame.size(), (8, 8));
        assert_eq!(*frame.color, color);
        let z = frame.point_cloud.index_axis(ndarray::Axis(2), 2);
        assert!(z.iter().any(|v| *v == 900));
        assert!(z.iter().all(|v| *v == 0 || *v == 900));
    }

    #[rstest]
    #[case(TransformMode::DepthSpace)]
    #[case(TransformMode::ColorSpace)]
    fn should_abort_on_driver_failure(identity_calibration: Calibration, #[case] mode: TransformMode) {
        let device = SyntheticDevice::with_calibration(identity_calibration.clone());
        device.fail_transforms(true);
        let (depth, color) = flat_wall(&identity_calibration, 900);

        let result = transform(&device, &identity_calibration, None, &depth, &color, mode);
        assert!(matches!(result, Err(KinectError::Transform(_))));
    }

    #[test]
    fn should_parse_modes() {
        assert_eq!("depth".parse::<TransformMode>().unwrap(), TransformMode::DepthSpace);
        assert_eq!("Color".parse::<TransformMode>().unwrap(), TransformMode::ColorSpace);
        assert_eq!("depth_to_color".parse::<TransformMode>().unwrap(), TransformMode::ColorSpace);
        assert!("both".parse::<TransformMode>().is_err());
        assert_eq!(TransformMode::ColorSpace.to_string(), "color");
    }
}
