use nalgebra::Vector3;
use ndarray::prelude::*;

use crate::memory::Array2Recycle;

/// Point cloud laid out as parallel arrays, one row per pixel of the grid it
/// was built from. Invalid or filtered out points are kept as `(0, 0, 0)`.
#[derive(Clone, Debug, PartialEq)]
pub struct PointCloud {
    /// XYZ in millimeters. Shape is (N, 3).
    pub points: Array2<f32>,
    /// RGB colors. Shape is (N, 3).
    pub colors: Array2<u8>,
}

impl Default for PointCloud {
    fn default() -> Self {
        Self::zeros(0)
    }
}

impl PointCloud {
    pub fn zeros(len: usize) -> Self {
        Self {
            points: Array2::<f32>::zeros((len, 3)),
            colors: Array2::<u8>::zeros((len, 3)),
        }
    }

    /// A cloud with `len` points that reuses the arrays of `previous` when
    /// their shape fits. Reused arrays are not cleared.
    pub fn recycled(len: usize, previous: Option<PointCloud>) -> Self {
        let (points, colors) = match previous {
            Some(cloud) => (Some(cloud.points), Some(cloud.colors)),
            None => (None, None),
        };
        Self {
            points: Array2Recycle::from(points).get((len, 3)),
            colors: Array2Recycle::from(colors).get((len, 3)),
        }
    }

    /// Number of point slots, valid or not.
    pub fn len(&self) -> usize {
        self.points.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, index: usize) -> Vector3<f32> {
        let row = self.points.row(index);
        Vector3::new(row[0], row[1], row[2])
    }

    pub fn color(&self, index: usize) -> [u8; 3] {
        let row = self.colors.row(index);
        [row[0], row[1], row[2]]
    }

    pub fn is_zero(&self, index: usize) -> bool {
        self.points.row(index).iter().all(|v| *v == 0.0)
    }

    /// Number of non-zero points.
    pub fn valid_count(&self) -> usize {
        self.points
            .outer_iter()
            .filter(|point| point.iter().any(|v| *v != 0.0))
            .count()
    }

    /// Iterates over the non-zero points and their colors.
    pub fn iter_valid(&self) -> impl Iterator<Item = (Vector3<f32>, [u8; 3])> + '_ {
        self.points
            .outer_iter()
            .zip(self.colors.outer_iter())
            .filter(|(point, _)| point.iter().any(|v| *v != 0.0))
            .map(|(point, color)| {
                (
                    Vector3::new(point[0], point[1], point[2]),
                    [color[0], color[1], color[2]],
                )
            })
    }
}
