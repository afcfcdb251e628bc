//! Buffer types exchanged with the device driver.
//!
//! All buffers are row-major ndarrays with shape `(height, width, ...)`.

use ndarray::{Array2, Array3};

mod bgra;
pub use bgra::{IntoImageRgb8, BGRA_CHANNELS};

mod depth;
pub use depth::IntoLumaImage;

/// Depth in millimeters, 0 means no measurement. Shape: (height, width).
pub type DepthImage = Array2<u16>;

/// 8-bit BGRA color image. Shape: (height, width, 4).
pub type ColorImage = Array3<u8>;

/// Per-pixel XYZ in millimeters, as produced by the driver. Shape: (height, width, 3).
pub type PointCloudImage = Array3<i16>;

/// (width, height) of any of the image buffers.
pub fn image_size<A, D>(image: &ndarray::ArrayBase<A, D>) -> (usize, usize)
where
    A: ndarray::Data,
    D: ndarray::Dimension,
{
    let shape = image.shape();
    (shape[1], shape[0])
}
