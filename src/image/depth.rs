use image::GrayImage;

use super::DepthImage;

/// Trait to convert an ndarray::Array* to an image::GrayImage
pub trait IntoLumaImage {
    fn to_luma_image(&self) -> GrayImage;
}

impl IntoLumaImage for DepthImage {
    /// Stretches the measured depth range to [0, 255]. Pixels without depth stay black.
    fn to_luma_image(&self) -> GrayImage {
        let (height, width) = self.dim();

        let max = self.iter().copied().max().unwrap_or(0) as f32;
        let min = self.iter().copied().filter(|x| *x != 0).min().unwrap_or(0) as f32;
        let range = (max - min).max(1.0);

        let u8_image = self.map(|x| {
            if *x == 0 {
                0
            } else {
                (((*x as f32 - min) / range) * 254.0) as u8 + 1
            }
        });

        let mut pixels = Vec::with_capacity(width * height);
        pixels.extend(u8_image.iter().copied());
        GrayImage::from_vec(width as u32, height as u32, pixels)
            .unwrap_or_else(|| GrayImage::new(width as u32, height as u32))
    }
}
