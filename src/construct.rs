use ndarray::{s, Axis};
use tracing::debug;

use crate::{
    bounds::SpatialBounds,
    error::KinectError,
    image::{image_size, ColorImage, PointCloudImage},
    pointcloud::PointCloud,
};

/// Full cloud and the context cut out of it by a [`SpatialBounds`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Clouds {
    pub full: PointCloud,
    pub context: PointCloud,
}

impl Clouds {
    /// Number of point slots, the same in both clouds.
    pub fn num_points(&self) -> usize {
        self.full.len()
    }
}

/// Builds the full cloud and the context from a transformed frame.
///
/// See [`construct_into`].
pub fn construct(
    point_cloud: &PointCloudImage,
    color: &ColorImage,
    bounds: &SpatialBounds,
) -> Result<Clouds, KinectError> {
    construct_into(point_cloud, color, bounds, None)
}

/// Builds the full cloud and the context from a transformed frame, reusing
/// the arrays of `previous` when the grid did not change.
///
/// For each pixel:
/// * a zero Z marks the point invalid: its XYZ is zero in both clouds;
/// * otherwise the integer XYZ is widened to `f32` without scaling;
/// * the point is kept in the context iff it lies inside `bounds`,
///   or unconditionally when the bounds are unbounded.
///
/// Colors are copied for every slot in both clouds, reordered from BGR to RGB.
///
/// # Arguments
///
/// * `point_cloud` - XYZ image, shape (height, width, 3).
/// * `color` - BGRA image on the same grid, shape (height, width, 4).
/// * `bounds` - Context region.
/// * `previous` - Clouds of a previous cycle to reuse.
pub fn construct_into(
    point_cloud: &PointCloudImage,
    color: &ColorImage,
    bounds: &SpatialBounds,
    previous: Option<Clouds>,
) -> Result<Clouds, KinectError> {
    if image_size(point_cloud) != image_size(color)
        || point_cloud.shape()[2] != 3
        || color.shape()[2] < 3
    {
        return Err(KinectError::invalid_parameter(format!(
            "point cloud {:?} and color {:?} are not on the same grid",
            point_cloud.shape(),
            color.shape()
        )));
    }

    let (width, height) = image_size(point_cloud);
    let num_points = width * height;
    let (previous_full, previous_context) = match previous {
        Some(clouds) => (Some(clouds.full), Some(clouds.context)),
        None => (None, None),
    };
    let mut full = PointCloud::recycled(num_points, previous_full);
    let mut context = PointCloud::recycled(num_points, previous_context);

    let unbounded = bounds.is_unbounded();
    let mut valid_points = 0;
    let mut context_points = 0;

    for (i, (xyz, bgra)) in point_cloud
        .lanes(Axis(2))
        .into_iter()
        .zip(color.lanes(Axis(2)))
        .enumerate()
    {
        let rgb = [bgra[2], bgra[1], bgra[0]];
        for c in 0..3 {
            full.colors[[i, c]] = rgb[c];
            context.colors[[i, c]] = rgb[c];
        }

        if xyz[2] == 0 {
            full.points.slice_mut(s![i, ..]).fill(0.0);
            context.points.slice_mut(s![i, ..]).fill(0.0);
            continue;
        }

        valid_points += 1;
        let point = nalgebra::Vector3::new(xyz[0] as f32, xyz[1] as f32, xyz[2] as f32);
        let in_context = unbounded || bounds.contains(&point);
        if in_context {
            context_points += 1;
        }
        for c in 0..3 {
            full.points[[i, c]] = point[c];
            context.points[[i, c]] = if in_context { point[c] } else { 0.0 };
        }
    }

    debug!(
        num_points,
        valid_points, context_points, unbounded, "constructed point clouds"
    );
    Ok(Clouds { full, context })
}
