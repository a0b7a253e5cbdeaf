//! Ball detection: contour walk → ellipse fit → polar mapping → Kalman tracking.
//!
//! Grounded on `DetectBallThread` in `examples/original_source/.../camera.py`.

use coords::{cartesian_to_polar, map_pixels_to_cm, pixels_to_cm, polar_to_cartesian};
use filter::{KalmanFilter, Measurement};

use crate::frame::Mask;
use crate::geometry::{self, Ellipse};

/// `contour_size.ball` bounds and `filter_endurance.ball` (spec.md §4.3, §6).
#[derive(Debug, Clone, Copy)]
pub struct BallParams {
    pub min_area: f64,
    pub max_area: f64,
    pub endurance: u32,
    /// Option (b) from spec.md §9's open question: derive the prediction sanity box
    /// from the cm-valued calibration rather than comparing cm state against a
    /// pixel-shaped half-width. Default `true`; set `false` to replay the original's
    /// bit-for-bit (arguably unit-mismatched) behavior.
    pub cm_valued_sanity_box: bool,
}

impl Default for BallParams {
    fn default() -> Self {
        Self { min_area: 0.0, max_area: 230.0, endurance: 50, cm_valued_sanity_box: true }
    }
}

/// The raw (per-tick) and Kalman-filtered ball position, both in polar `(bearing°,
/// distance cm)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BallDetection {
    pub raw: Option<(f32, f32)>,
    pub filtered: Option<(f32, f32)>,
}

/// Tracks the ball across frames: a persistent Kalman filter plus a not-found counter.
pub struct BallDetector {
    filter: KalmanFilter,
    not_found: u32,
}

impl BallDetector {
    #[must_use]
    pub fn new() -> Self {
        Self { filter: KalmanFilter::new(), not_found: u32::MAX }
    }

    /// Runs one detection tick against the orange mask.
    pub fn tick(&mut self, orange_mask: &Mask, params: &BallParams) -> BallDetection {
        let (width, height) = orange_mask.dimensions();
        let frame_shape = (width as f32, height as f32);

        let contours = geometry::external_contours(orange_mask);
        let candidates = geometry::look_through_contours(contours, params.min_area, params.max_area);

        let ellipse = find_acceptable_ellipse(&candidates);

        let raw = if let Some(ellipse) = ellipse {
            self.not_found = 0;
            let (bearing, distance) =
                map_pixels_to_cm(frame_shape, ellipse.center.0 as f32, ellipse.center.1 as f32);
            self.update_filter(bearing, distance, ellipse.axes);
            Some((bearing, distance))
        } else {
            self.not_found = self.not_found.saturating_add(1);
            None
        };

        let filtered = if self.not_found <= params.endurance {
            self.predicted_detection(frame_shape, params.cm_valued_sanity_box)
        } else {
            None
        };

        BallDetection { raw, filtered }
    }

    fn update_filter(&mut self, bearing: f32, distance: f32, axes: (f64, f64)) {
        let (dx, dy) = polar_to_cartesian(bearing, distance);
        let z = Measurement::new(dx, dy, 2.0 * axes.0 as f32, 2.0 * axes.1 as f32);
        let _ = self.filter.update(z);
    }

    fn predicted_detection(&mut self, frame_shape: (f32, f32), cm_valued_sanity_box: bool) -> Option<(f32, f32)> {
        let state = self.filter.predict()?;
        let (dx, dy) = (state[0], state[1]);

        let in_bounds = if cm_valued_sanity_box {
            let max_distance_cm = pixels_to_cm(frame_shape.0.max(frame_shape.1) / 2.0);
            dx.hypot(dy) <= max_distance_cm
        } else {
            dx.abs() <= frame_shape.0 / 2.0 && dy.abs() <= frame_shape.1 / 2.0
        };

        if !in_bounds {
            return None;
        }

        Some(cartesian_to_polar(dx, dy))
    }
}

impl Default for BallDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Walks contours in descending-area order. A contour with ≥5 points yields a real
/// ellipse fit (discarded if degenerate); a contour with fewer points synthesizes a
/// pseudo-ellipse from its centroid (axes fixed at 2px, matching the original tracker's
/// arbitrary fallback).
fn find_acceptable_ellipse(contours: &[Vec<(i32, i32)>]) -> Option<Ellipse> {
    for contour in contours {
        if contour.len() >= 5 {
            if let Some(ellipse) = geometry::fit_ellipse(contour) {
                return Some(ellipse);
            }
        } else if !contour.is_empty() {
            let (x, y) = geometry::centroid(contour);
            return Some(Ellipse { center: (x, y), axes: (2.0, 2.0), angle: 0.0 });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Mask;

    fn disc_mask(width: u32, height: u32, center: (i32, i32), radius: i32) -> Mask {
        Mask::from_fn(width, height, |x, y| {
            let dx = x as i32 - center.0;
            let dy = y as i32 - center.1;
            image::Luma([if dx * dx + dy * dy <= radius * radius { 255 } else { 0 }])
        })
    }

    #[test]
    fn a_single_disc_produces_the_expected_bearing_and_distance() {
        let (w, h) = (640, 480);
        let mut detector = BallDetector::new();
        let mask = disc_mask(w, h, (w as i32 / 2 + 20, h as i32 / 2), 7);

        let detection = detector.tick(&mask, &BallParams::default());
        let (bearing, distance) = detection.raw.expect("disc should be detected");

        assert!((bearing - 90.0).abs() < 2.0, "expected ~90 degrees clockwise of up, got {bearing}");
        assert!((distance - coords::pixels_to_cm(20.0)).abs() < 2.0);
    }

    #[test]
    fn endurance_exhausts_after_the_configured_number_of_blank_frames() {
        let (w, h) = (640, 480);
        let mut detector = BallDetector::new();
        let params = BallParams { endurance: 5, ..BallParams::default() };
        let disc = disc_mask(w, h, (w as i32 / 2, h as i32 / 2), 7);
        let blank = Mask::new(w, h);

        // The very first predict ever has no prior timestamp to derive dt from, so it
        // yields no prediction; from the second measurement onward it does.
        let mut last_seen_filtered = None;
        for _ in 0..3 {
            let detection = detector.tick(&disc, &params);
            last_seen_filtered = detection.filtered;
        }
        assert!(last_seen_filtered.is_some(), "filter should be producing predictions by the third tick");

        let mut last_filtered = None;
        for _ in 0..5 {
            let detection = detector.tick(&blank, &params);
            last_filtered = detection.filtered;
        }
        assert!(last_filtered.is_some(), "still within endurance");

        let detection = detector.tick(&blank, &params);
        assert!(detection.filtered.is_none(), "endurance exceeded, ball must become absent");
    }

    #[test]
    fn no_measurement_ever_seen_never_predicts() {
        let (w, h) = (640, 480);
        let mut detector = BallDetector::new();
        let blank = Mask::new(w, h);
        let detection = detector.tick(&blank, &BallParams::default());
        assert!(detection.filtered.is_none());
        assert!(detection.raw.is_none());
    }
}
