//! Goal detection: contour walk → polygon-complexity check → minimum-area rotated
//! rectangle → polar mapping → Kalman tracking. Runs identically for the blue and
//! yellow masks, each with its own [`GoalDetector`] instance.
//!
//! Grounded on `DetectGoalsThread` in `examples/original_source/.../camera.py`.

use coords::{cartesian_to_polar, map_pixels_to_cm, polar_to_cartesian};
use filter::{KalmanFilter, Measurement};

use crate::frame::Mask;
use crate::geometry::{self, RotatedRect};

/// `contour_size.goal`, `filter_endurance.goal`, and the polygon-complexity epsilon
/// coefficient (spec.md §4.4, §9 Open Question 4: made tunable rather than hardcoded).
#[derive(Debug, Clone, Copy)]
pub struct GoalParams {
    pub min_area: f64,
    pub endurance: u32,
    pub polygon_epsilon_coefficient: f64,
}

impl Default for GoalParams {
    fn default() -> Self {
        Self { min_area: 100.0, endurance: 200, polygon_epsilon_coefficient: 0.03 }
    }
}

/// The raw and Kalman-filtered goal position, plus the rotated rect the Annotator draws
/// a box around.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoalDetection {
    pub raw: Option<(f32, f32)>,
    pub filtered: Option<(f32, f32)>,
    pub rect: Option<RotatedRect>,
}

/// Tracks one goal (blue or yellow) across frames.
pub struct GoalDetector {
    filter: KalmanFilter,
    not_found: u32,
}

impl GoalDetector {
    #[must_use]
    pub fn new() -> Self {
        Self { filter: KalmanFilter::new(), not_found: u32::MAX }
    }

    /// Runs one detection tick against this goal's color mask.
    pub fn tick(&mut self, mask: &Mask, params: &GoalParams) -> GoalDetection {
        let (width, height) = mask.dimensions();
        let frame_shape = (width as f32, height as f32);

        let contours = geometry::external_contours(mask);
        let candidates = geometry::look_through_contours(contours, params.min_area, f64::INFINITY);

        let rect = find_acceptable_rect(&candidates, params.polygon_epsilon_coefficient);

        let raw = if let Some(rect) = rect {
            self.not_found = 0;
            let (bearing, distance) =
                map_pixels_to_cm(frame_shape, rect.center.0 as f32, rect.center.1 as f32);
            self.update_filter(bearing, distance, rect.size);
            Some((bearing, distance))
        } else {
            self.not_found = self.not_found.saturating_add(1);
            None
        };

        let filtered =
            if self.not_found <= params.endurance { self.predicted_detection(frame_shape) } else { None };

        GoalDetection { raw, filtered, rect }
    }

    fn update_filter(&mut self, bearing: f32, distance: f32, size: (f64, f64)) {
        let (dx, dy) = polar_to_cartesian(bearing, distance);
        // Goal measurements use the rect's sides directly (not doubled, unlike the
        // ball's ellipse diameters).
        let z = Measurement::new(dx, dy, size.0 as f32, size.1 as f32);
        let _ = self.filter.update(z);
    }

    /// The goal prediction sanity box is the mask dimensions themselves, matching
    /// `camera.py`'s `-blue_mask.shape[1] <= dx <= blue_mask.shape[1] and
    /// -blue_mask.shape[0] <= dy <= blue_mask.shape[0]`: the state is compared directly
    /// against the pixel-sized box with no cm conversion. Unlike the ball (spec.md §9
    /// Open Question 3), there's no sanctioned deviation here.
    fn predicted_detection(&mut self, frame_shape: (f32, f32)) -> Option<(f32, f32)> {
        let state = self.filter.predict()?;
        let (dx, dy) = (state[0], state[1]);

        if dx.abs() > frame_shape.0 || dy.abs() > frame_shape.1 {
            return None;
        }

        Some(cartesian_to_polar(dx, dy))
    }
}

impl Default for GoalDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Walks contours in descending-area order, accepting the first whose Douglas-Peucker
/// approximation yields at most 6 vertices — the complexity check that rejects
/// concave/annulus-shaped blobs.
fn find_acceptable_rect(contours: &[Vec<(i32, i32)>], epsilon_coefficient: f64) -> Option<RotatedRect> {
    for contour in contours {
        let epsilon = epsilon_coefficient * geometry::arc_length(contour);
        if geometry::simplified_vertex_count(contour, epsilon) <= 6 {
            if let Some(rect) = geometry::min_area_rect(contour) {
                return Some(rect);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Mask;

    fn rect_mask(width: u32, height: u32, top_left: (i32, i32), size: (i32, i32)) -> Mask {
        Mask::from_fn(width, height, |x, y| {
            let (x, y) = (x as i32, y as i32);
            let inside = x >= top_left.0
                && x < top_left.0 + size.0
                && y >= top_left.1
                && y < top_left.1 + size.1;
            image::Luma([if inside { 255 } else { 0 }])
        })
    }

    /// A plus/cross shape: eight concave corners that Douglas-Peucker cannot collapse to
    /// <= 6 vertices at the goal detector's epsilon, standing in for the spec's
    /// "concave blob" rejection scenario.
    fn cross_mask(width: u32, height: u32, center: (i32, i32), arm: i32, thickness: i32) -> Mask {
        Mask::from_fn(width, height, |x, y| {
            let dx = (x as i32 - center.0).abs();
            let dy = (y as i32 - center.1).abs();
            let inside = (dx <= thickness && dy <= arm) || (dy <= thickness && dx <= arm);
            image::Luma([if inside { 255 } else { 0 }])
        })
    }

    #[test]
    fn a_rectangle_is_detected_with_a_matching_rotated_rect() {
        let mut detector = GoalDetector::new();
        let mask = rect_mask(200, 200, (50, 50), (40, 20));

        let detection = detector.tick(&mask, &GoalParams::default());
        assert!(detection.raw.is_some());
        let rect = detection.rect.expect("rectangle should be detected");
        assert!((rect.size.0 * rect.size.1 - 800.0).abs() < 50.0);
    }

    #[test]
    fn a_concave_cross_is_rejected_by_the_polygon_complexity_check() {
        let mut detector = GoalDetector::new();
        let mask = cross_mask(200, 200, (100, 100), 60, 10);

        let detection = detector.tick(&mask, &GoalParams::default());
        assert!(detection.raw.is_none(), "a plus shape has 8 concave vertices, too many to approximate with <= 6");
    }

    #[test]
    fn endurance_for_goals_is_longer_than_for_the_ball() {
        assert!(GoalParams::default().endurance > 50);
    }
}
