//! BGR→HSV conversion and threshold masking, the Rust counterpart of
//! `cv2.cvtColor(..., COLOR_BGR2HSV)` and `cv2.inRange`.
//!
//! Hue is scaled to `0..=179` and saturation/value to `0..=255`, matching OpenCV's 8-bit
//! HSV convention — the parameter block's HSV bounds (e.g. orange `[(0, 170, 160), (13,
//! 255, 255)]`) are only meaningful under that scale.

use crate::frame::{Frame, Mask};

/// An HSV raster with the same OpenCV 8-bit scale as the masks it produces: H in
/// `0..=179`, S and V in `0..=255`. Reuses [`image::Rgb`] as a plain 3-tuple container,
/// not as an actual RGB color space.
pub type HsvImage = image::ImageBuffer<image::Rgb<u8>, Vec<u8>>;

/// An inclusive HSV bound, `(hue, saturation, value)`.
pub type HsvBound = (u8, u8, u8);

/// Converts a BGR frame to the HSV raster used for color masking.
#[must_use]
pub fn bgr_to_hsv(frame: &Frame) -> HsvImage {
    let (width, height) = frame.dimensions();
    let mut hsv = HsvImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let [b, g, r] = frame.get_pixel(x, y).expect("in bounds by construction");
            hsv.put_pixel(x, y, image::Rgb(rgb_to_hsv_u8(r, g, b)));
        }
    }

    hsv
}

/// Converts one 8-bit RGB triple to OpenCV-scaled 8-bit HSV.
fn rgb_to_hsv_u8(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta <= f32::EPSILON {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let saturation = if max <= f32::EPSILON { 0.0 } else { delta / max };

    let h = (hue / 2.0).round().clamp(0.0, 179.0) as u8;
    let s = (saturation * 255.0).round().clamp(0.0, 255.0) as u8;
    let v = max.round().clamp(0.0, 255.0) as u8;

    [h, s, v]
}

/// `cv2.inRange`: a 255 pixel wherever every HSV channel falls within `[lower, upper]`
/// inclusive, 0 otherwise.
#[must_use]
pub fn in_range(hsv: &HsvImage, lower: HsvBound, upper: HsvBound) -> Mask {
    let (width, height) = hsv.dimensions();
    Mask::from_fn(width, height, |x, y| {
        let image::Rgb([h, s, v]) = *hsv.get_pixel(x, y);
        let inside = h >= lower.0 && h <= upper.0 && s >= lower.1 && s <= upper.1 && v >= lower.2 && v <= upper.2;
        image::Luma([if inside { 255 } else { 0 }])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_orange_falls_inside_the_orange_bound() {
        // OpenCV orange (BGR ~ (0, 128, 255)) sits around hue 15.
        let frame = Frame::from_bgr(1, 1, vec![0, 128, 255]);
        let hsv = bgr_to_hsv(&frame);
        let image::Rgb([h, s, v]) = *hsv.get_pixel(0, 0);
        assert!(h <= 20, "expected a low hue for orange, got {h}");
        assert!(s > 200);
        assert_eq!(v, 255);
    }

    #[test]
    fn in_range_thresholds_per_channel() {
        let mut hsv = HsvImage::new(2, 1);
        hsv.put_pixel(0, 0, image::Rgb([10, 200, 200]));
        hsv.put_pixel(1, 0, image::Rgb([100, 200, 200]));

        let mask = in_range(&hsv, (0, 170, 160), (13, 255, 255));
        assert_eq!(mask.get_pixel(0, 0).0, [255]);
        assert_eq!(mask.get_pixel(1, 0).0, [0]);
    }

    #[test]
    fn grey_has_zero_saturation() {
        let frame = Frame::from_bgr(1, 1, vec![128, 128, 128]);
        let hsv = bgr_to_hsv(&frame);
        let image::Rgb([_, s, _]) = *hsv.get_pixel(0, 0);
        assert_eq!(s, 0);
    }
}
