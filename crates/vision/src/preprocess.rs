//! Frame preprocessing: circular crop, reorientation to the robot's body frame, HSV
//! color masking, and the optional field mask derived from the convex hull of colored
//! pixels.
//!
//! A straight generalization of the original tracker's `PreprocessFrameThread.preprocess`
//! (`examples/original_source/.../camera.py`) and its `util.py` helpers (`crop_circle`,
//! `mask`, `close_mask`).

use image::imageops;
use imageproc::morphology::{close, Norm};

use crate::frame::{Frame, Mask};
use crate::geometry::{self, Pixel};
use crate::hsv::{self, HsvBound};

/// The offset and radius of the circular lens-correction crop, plus the per-color HSV
/// thresholds and field-masking toggle. Mirrors `ParameterBlock.frame`/`.mask` (spec.md
/// §6).
#[derive(Debug, Clone)]
pub struct PreprocessParams {
    /// `(x, y)` lens-centering offset in pixels, compensating a mis-centered lens.
    pub center_offset: (i32, i32),
    pub crop_radius: u32,
    pub robot_radius: u32,
    pub mask_field: bool,
    pub orange: (HsvBound, HsvBound),
    pub blue: (HsvBound, HsvBound),
    pub yellow: (HsvBound, HsvBound),
    pub green: (HsvBound, HsvBound),
}

/// The four named color masks plus the cropped/oriented frame they were derived from,
/// all pixel-aligned, published atomically (spec.md §4.2).
pub struct Preprocessed {
    pub cropped_frame: Frame,
    pub orange: Mask,
    pub blue: Mask,
    pub yellow: Mask,
    /// Only populated when `mask_field` is enabled; otherwise an all-black mask the
    /// Annotator can still display without a branch.
    pub green: Mask,
    pub raw_field_mask: Mask,
    pub field_mask: Mask,
}

/// Crops `frame` to a circular region of the configured radius, centered at `W/2 -
/// offset.x, H/2 - offset.y`, then rotates 90° counter-clockwise and flips horizontally
/// so that "robot forward" lands at image-up.
#[must_use]
pub fn crop_and_orient(frame: &Frame, center_offset: (i32, i32), radius: u32) -> Frame {
    let (width, height) = frame.dimensions();
    let center_x = width as i32 / 2 - center_offset.0;
    let center_y = height as i32 / 2 - center_offset.1;

    let r = radius as i32;
    let x0 = (center_x - r).max(0);
    let y0 = (center_y - r).max(0);
    let x1 = (center_x + r).min(width as i32);
    let y1 = (center_y + r).min(height as i32);
    let (crop_w, crop_h) = ((x1 - x0).max(0) as u32, (y1 - y0).max(0) as u32);

    let mut cropped = image::RgbImage::new(crop_w, crop_h);
    for y in 0..crop_h as i32 {
        for x in 0..crop_w as i32 {
            let (src_x, src_y) = (x0 + x, y0 + y);
            let dx = src_x - center_x;
            let dy = src_y - center_y;
            if dx * dx + dy * dy > r * r {
                continue; // outside the disc stays black, like the bitwise-AND mask
            }
            if let Some([b, g, red]) = frame.get_pixel(src_x as u32, src_y as u32) {
                cropped.put_pixel(x as u32, y as u32, image::Rgb([red, g, b]));
            }
        }
    }

    let rotated = imageops::rotate270(&cropped); // 90° counter-clockwise
    let flipped = imageops::flip_horizontal(&rotated);
    Frame::from_rgb_image(&flipped)
}

/// Runs the full preprocessing pipeline on one raw frame.
#[must_use]
pub fn preprocess(frame: &Frame, params: &PreprocessParams) -> Preprocessed {
    let cropped_frame = crop_and_orient(frame, params.center_offset, params.crop_radius);
    let hsv_image = hsv::bgr_to_hsv(&cropped_frame);

    let raw_orange = hsv::in_range(&hsv_image, params.orange.0, params.orange.1);
    let raw_blue = hsv::in_range(&hsv_image, params.blue.0, params.blue.1);
    let raw_yellow = hsv::in_range(&hsv_image, params.yellow.0, params.yellow.1);

    let (width, height) = cropped_frame.dimensions();
    let (green, raw_field_mask, mut field_mask) = if params.mask_field {
        let raw_green = hsv::in_range(&hsv_image, params.green.0, params.green.1);
        let union = union_masks(&[&raw_orange, &raw_blue, &raw_yellow, &raw_green]);
        let closed = close_mask(&union, 3, 2);
        let hull_mask = field_mask_from_hull(&closed);
        (raw_green, closed, hull_mask)
    } else {
        let all_ones = Mask::from_pixel(width, height, image::Luma([255]));
        (Mask::new(width, height), Mask::new(width, height), all_ones)
    };

    subtract_robot_disc(&mut field_mask, params.robot_radius);

    let orange = and_masks(&raw_orange, &field_mask);
    let blue = and_masks(&raw_blue, &field_mask);
    let yellow = and_masks(&raw_yellow, &field_mask);

    Preprocessed { cropped_frame, orange, blue, yellow, green, raw_field_mask, field_mask }
}

fn union_masks(masks: &[&Mask]) -> Mask {
    let (width, height) = masks[0].dimensions();
    Mask::from_fn(width, height, |x, y| {
        let any = masks.iter().any(|m| m.get_pixel(x, y).0[0] != 0);
        image::Luma([if any { 255 } else { 0 }])
    })
}

fn and_masks(a: &Mask, b: &Mask) -> Mask {
    let (width, height) = a.dimensions();
    Mask::from_fn(width, height, |x, y| {
        let both = a.get_pixel(x, y).0[0] != 0 && b.get_pixel(x, y).0[0] != 0;
        image::Luma([if both { 255 } else { 0 }])
    })
}

/// Morphological close (dilate then erode) repeated `iterations` times, approximating
/// OpenCV's elliptical structuring element with `imageproc`'s L-infinity-norm
/// square/diamond kernel of the same radius.
fn close_mask(mask: &Mask, radius: u8, iterations: u32) -> Mask {
    let mut out = mask.clone();
    for _ in 0..iterations {
        out = close(&out, Norm::LInf, radius);
    }
    out
}

/// Finds the largest external contour of `mask`, takes its convex hull, and fills a
/// fresh mask with that hull polygon. Falls back to "all ones" when no contour exists,
/// matching the original tracker's fallback.
fn field_mask_from_hull(mask: &Mask) -> Mask {
    let (width, height) = mask.dimensions();
    let contours = geometry::external_contours(mask);

    let Some(largest) = contours.into_iter().max_by(|a, b| {
        geometry::contour_area(a).partial_cmp(&geometry::contour_area(b)).unwrap()
    }) else {
        return Mask::from_pixel(width, height, image::Luma([255]));
    };

    let hull: Vec<Pixel> = geometry::convex_hull(&largest).into_iter().map(|(x, y)| (x.round() as i32, y.round() as i32)).collect();
    fill_convex_polygon(width, height, &hull)
}

/// `cv2.fillConvexPoly` for a simple scanline polygon fill: since the polygon is
/// convex, each raster row intersects its boundary in at most one span.
fn fill_convex_polygon(width: u32, height: u32, hull: &[Pixel]) -> Mask {
    let mut out = Mask::new(width, height);
    if hull.len() < 3 {
        return out;
    }

    for y in 0..height as i32 {
        let mut xs = Vec::new();
        for i in 0..hull.len() {
            let (x0, y0) = hull[i];
            let (x1, y1) = hull[(i + 1) % hull.len()];
            if (y0 <= y && y < y1) || (y1 <= y && y < y0) {
                let t = f64::from(y - y0) / f64::from(y1 - y0);
                xs.push(f64::from(x0) + t * f64::from(x1 - x0));
            }
        }
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        for pair in xs.chunks(2) {
            if let [lo, hi] = pair {
                let (lo, hi) = (lo.round() as i32, hi.round() as i32);
                for x in lo.max(0)..hi.min(width as i32) {
                    out.put_pixel(x as u32, y as u32, image::Luma([255]));
                }
            }
        }
    }

    out
}

/// Paints a filled black disc of `radius` at the mask's center, suppressing the robot's
/// own body from the field mask.
fn subtract_robot_disc(mask: &mut Mask, radius: u32) {
    let (width, height) = mask.dimensions();
    let (cx, cy) = (width as i32 / 2, height as i32 / 2);
    let r = radius as i32;
    for y in (cy - r).max(0)..(cy + r).min(height as i32) {
        for x in (cx - r).max(0)..(cx + r).min(width as i32) {
            if (x - cx).pow(2) + (y - cy).pow(2) <= r * r {
                mask.put_pixel(x as u32, y as u32, image::Luma([0]));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, bgr: [u8; 3]) -> Frame {
        Frame::from_bgr(width, height, bgr.repeat((width * height) as usize))
    }

    fn default_params(mask_field: bool) -> PreprocessParams {
        PreprocessParams {
            center_offset: (0, 0),
            crop_radius: 50,
            robot_radius: 10,
            mask_field,
            orange: ((0, 170, 160), (13, 255, 255)),
            blue: ((98, 160, 60), (120, 255, 255)),
            yellow: ((15, 110, 110), (40, 255, 255)),
            green: ((45, 60, 80), (100, 255, 255)),
        }
    }

    #[test]
    fn crop_radius_shapes_the_output_window() {
        let frame = solid_frame(200, 200, [0, 0, 0]);
        let cropped = crop_and_orient(&frame, (0, 0), 50);
        assert_eq!(cropped.dimensions(), (100, 100));
    }

    #[test]
    fn field_mask_without_masking_is_all_ones_minus_robot_disc() {
        let frame = solid_frame(100, 100, [0, 0, 0]);
        let result = preprocess(&frame, &default_params(false));

        let (w, h) = result.field_mask.dimensions();
        let (cx, cy) = (w / 2, h / 2);
        assert_eq!(result.field_mask.get_pixel(cx, cy).0, [0], "robot disc center is masked out");
        assert_eq!(result.field_mask.get_pixel(0, 0).0, [255], "corner stays unmasked");
    }

    #[test]
    fn blank_frame_with_field_masking_falls_back_to_all_ones() {
        let frame = solid_frame(100, 100, [0, 0, 0]);
        let result = preprocess(&frame, &default_params(true));

        let (w, h) = result.field_mask.dimensions();
        assert_eq!(result.field_mask.get_pixel(0, 0).0, [255], "no colored pixels means no contour, fallback to all-ones");
    }

    #[test]
    fn masks_share_the_cropped_frame_shape() {
        let frame = solid_frame(120, 120, [0, 0, 0]);
        let result = preprocess(&frame, &default_params(false));
        assert_eq!(result.orange.dimensions(), result.cropped_frame.dimensions());
        assert_eq!(result.blue.dimensions(), result.cropped_frame.dimensions());
        assert_eq!(result.yellow.dimensions(), result.cropped_frame.dimensions());
    }
}
