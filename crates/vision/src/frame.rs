//! The raw and cropped BGR rasters that flow through the pipeline.
//!
//! The camera's native channel order is BGR (matching most V4L2/OpenCV pipelines), so
//! [`Frame`] keeps that order end to end rather than paying a conversion to RGB that
//! nothing downstream needs.

/// A single-channel binary raster (255/0), pixel-aligned with the [`Frame`] it was
/// derived from. `imageproc`'s contour and morphology operations work directly on this
/// type.
pub type Mask = image::GrayImage;

/// A 2D raster of BGR pixels at a fixed resolution.
///
/// Produced once by `FrameSource`, consumed by `Preprocessor`, then dropped: frames are
/// never persisted or reused across ticks.
#[derive(Debug, Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    /// Row-major BGR8 pixel data, 3 bytes per pixel, no padding.
    data: Vec<u8>,
}

impl Frame {
    /// Builds a frame from a flat BGR8 buffer. Panics if `data.len()` doesn't match
    /// `width * height * 3`, which would indicate a decoder bug upstream.
    #[must_use]
    pub fn from_bgr(width: u32, height: u32, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            width as usize * height as usize * 3,
            "BGR buffer length must match width * height * 3"
        );
        Self { width, height, data }
    }

    /// Builds a frame from an RGB raster by swapping the red and blue channels.
    #[must_use]
    pub fn from_rgb_image(rgb: &image::RgbImage) -> Self {
        let (width, height) = rgb.dimensions();
        let mut data = Vec::with_capacity(rgb.as_raw().len());
        for px in rgb.pixels() {
            data.push(px.0[2]);
            data.push(px.0[1]);
            data.push(px.0[0]);
        }
        Self { width, height, data }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn as_bgr(&self) -> &[u8] {
        &self.data
    }

    /// The BGR triple at `(x, y)`, or `None` if out of bounds.
    #[must_use]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Converts this frame into an [`image::RgbImage`] (swapping channels back) purely
    /// for the debug-UI collaborator, which expects a standard RGB raster to encode as
    /// JPEG/PNG.
    #[must_use]
    pub fn to_rgb_image(&self) -> image::RgbImage {
        let mut out = image::RgbImage::new(self.width, self.height);
        for (dst, src) in out.pixels_mut().zip(self.data.chunks_exact(3)) {
            *dst = image::Rgb([src[2], src[1], src[0]]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_single_pixel() {
        let frame = Frame::from_bgr(1, 1, vec![10, 20, 30]);
        assert_eq!(frame.get_pixel(0, 0), Some([10, 20, 30]));
        assert_eq!(frame.get_pixel(1, 0), None);
    }

    #[test]
    fn from_rgb_image_swaps_channels() {
        let mut rgb = image::RgbImage::new(1, 1);
        rgb.put_pixel(0, 0, image::Rgb([1, 2, 3]));
        let frame = Frame::from_rgb_image(&rgb);
        assert_eq!(frame.get_pixel(0, 0), Some([3, 2, 1]));
    }
}
