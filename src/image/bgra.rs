use image::RgbImage;
use ndarray::Axis;

use super::ColorImage;

pub const BGRA_CHANNELS: usize = 4;

/// Trait to convert objects into image::RgbImage
pub trait IntoImageRgb8 {
    fn to_image_rgb8(&self) -> RgbImage;
}

impl IntoImageRgb8 for ColorImage {
    /// Drops the alpha channel and swaps blue and red.
    fn to_image_rgb8(&self) -> RgbImage {
        let (height, width, _) = self.dim();
        let mut rgb = Vec::with_capacity(width * height * 3);
        for bgra in self.lanes(Axis(2)) {
            rgb.extend_from_slice(&[bgra[2], bgra[1], bgra[0]]);
        }
        RgbImage::from_raw(width as u32, height as u32, rgb)
            .unwrap_or_else(|| RgbImage::new(width as u32, height as u32))
    }
}
