//! Small geometry facility backing the contour-based detectors: area-ordered contour
//! walking, ellipse/rectangle fitting, convex hulls and polygon simplification.
//!
//! Per spec.md §9 ("fixed constants; evaluate via Horner, not a generic polynomial
//! library"), the pipeline avoids a heavyweight CV dependency for the handful of
//! primitives it actually needs: `imageproc` supplies contour tracing and morphology,
//! `geo` supplies convex hulls and Douglas-Peucker simplification (the same role it
//! plays in the teacher's field-mask-adjacent geo usage), and the rest — ellipse fit,
//! minimum-area rotated rectangle — is straightforward linear algebra written out by
//! hand, exactly as `filter` does for the Kalman matrices.

use geo::{ConvexHull, MultiPoint, Point, Simplify};
use imageproc::contours::{BorderType, Contour};

use crate::frame::Mask;

/// An integer pixel coordinate, `(x, y)`.
pub type Pixel = (i32, i32);

/// The external (outer-border) contours of a mask, in arbitrary order.
///
/// `RETR_EXTERNAL` in the original tracker keeps only outer contours, discarding holes;
/// `imageproc::contours::find_contours` already tags each contour with its
/// [`BorderType`], so this just filters on that tag.
#[must_use]
pub fn external_contours(mask: &Mask) -> Vec<Vec<Pixel>> {
    imageproc::contours::find_contours::<i32>(mask)
        .into_iter()
        .filter(|c: &Contour<i32>| c.border_type == BorderType::Outer)
        .map(|c| c.points.into_iter().map(|p| (p.x, p.y)).collect())
        .collect()
}

/// The shoelace-formula area of a (possibly open) polygon described by `points`.
#[must_use]
pub fn contour_area(points: &[Pixel]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut sum = 0.0;
    for i in 0..points.len() {
        let (x0, y0) = points[i];
        let (x1, y1) = points[(i + 1) % points.len()];
        sum += f64::from(x0) * f64::from(y1) - f64::from(x1) * f64::from(y0);
    }
    (sum / 2.0).abs()
}

/// Sorts contours by descending area and keeps only those with `min_area < area <
/// max_area`, mirroring the original tracker's `look_through_contours`.
#[must_use]
pub fn look_through_contours(mut contours: Vec<Vec<Pixel>>, min_area: f64, max_area: f64) -> Vec<Vec<Pixel>> {
    contours.sort_by(|a, b| contour_area(b).partial_cmp(&contour_area(a)).unwrap());
    contours
        .into_iter()
        .filter(|c| {
            let area = contour_area(c);
            area > min_area && area < max_area
        })
        .collect()
}

/// The image-moments centroid of a point set, `(m10/m00, m01/m00)`.
#[must_use]
pub fn centroid(points: &[Pixel]) -> (f64, f64) {
    let n = points.len() as f64;
    let sum_x: f64 = points.iter().map(|&(x, _)| f64::from(x)).sum();
    let sum_y: f64 = points.iter().map(|&(_, y)| f64::from(y)).sum();
    (sum_x / n, sum_y / n)
}

/// A fitted ellipse: center, `(semi-axis-a, semi-axis-b)`, and rotation angle in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    pub center: (f64, f64),
    pub axes: (f64, f64),
    pub angle: f64,
}

/// Fits an ellipse to a contour's points via its second-order image moments: the
/// centroid gives the center, and the eigenvectors/eigenvalues of the point covariance
/// matrix give axis directions and lengths. Needs at least 5 points, mirroring
/// `cv2.fitEllipse`'s own minimum. Returns `None` if the covariance is degenerate
/// (produces a NaN center or axis), which a caller discards exactly like a NaN
/// `cv2.fitEllipse` result.
#[must_use]
pub fn fit_ellipse(points: &[Pixel]) -> Option<Ellipse> {
    if points.len() < 5 {
        return None;
    }

    let (cx, cy) = centroid(points);
    let n = points.len() as f64;

    let mut mxx = 0.0;
    let mut myy = 0.0;
    let mut mxy = 0.0;
    for &(x, y) in points {
        let dx = f64::from(x) - cx;
        let dy = f64::from(y) - cy;
        mxx += dx * dx;
        myy += dy * dy;
        mxy += dx * dy;
    }
    mxx /= n;
    myy /= n;
    mxy /= n;

    let (lambda1, lambda2, angle) = symmetric_eigen_2x2(mxx, mxy, myy);
    // Scale factor of 2 so the semi-axes approximate fitEllipse's full-width convention.
    let a = 2.0 * lambda1.max(0.0).sqrt();
    let b = 2.0 * lambda2.max(0.0).sqrt();

    if !cx.is_finite() || !cy.is_finite() || !a.is_finite() || !b.is_finite() {
        return None;
    }

    Some(Ellipse { center: (cx, cy), axes: (a, b), angle })
}

/// Eigenvalues (descending) and the angle (radians) of the first eigenvector of a
/// symmetric 2x2 matrix `[[xx, xy], [xy, yy]]`.
fn symmetric_eigen_2x2(xx: f64, xy: f64, yy: f64) -> (f64, f64, f64) {
    let trace = xx + yy;
    let det = xx * yy - xy * xy;
    let discriminant = (trace * trace / 4.0 - det).max(0.0).sqrt();
    let lambda1 = trace / 2.0 + discriminant;
    let lambda2 = trace / 2.0 - discriminant;

    let angle = if xy.abs() > f64::EPSILON { (lambda1 - xx).atan2(xy) } else { 0.0 };

    (lambda1, lambda2, angle)
}

/// A minimum-area rectangle enclosing a point set, possibly rotated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    pub center: (f64, f64),
    /// `(width, height)` of the rectangle's sides (not halved).
    pub size: (f64, f64),
    pub angle: f64,
}

/// The minimum-area bounding rectangle of `points`, found by the standard rotating-
/// calipers technique: the optimal rectangle always has one side flush with a convex
/// hull edge, so it suffices to try one orientation per hull edge.
#[must_use]
pub fn min_area_rect(points: &[Pixel]) -> Option<RotatedRect> {
    let hull = convex_hull(points);
    if hull.len() < 3 {
        return hull.first().map(|&(x, y)| RotatedRect { center: (x, y), size: (0.0, 0.0), angle: 0.0 });
    }

    let mut best: Option<RotatedRect> = None;
    for i in 0..hull.len() {
        let (x0, y0) = hull[i];
        let (x1, y1) = hull[(i + 1) % hull.len()];
        let edge_angle = (y1 - y0).atan2(x1 - x0);

        let (sin, cos) = edge_angle.sin_cos();
        let (mut min_u, mut max_u, mut min_v, mut max_v) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
        for &(x, y) in &hull {
            let u = x * cos + y * sin;
            let v = -x * sin + y * cos;
            min_u = min_u.min(u);
            max_u = max_u.max(u);
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }

        let (width, height) = (max_u - min_u, max_v - min_v);
        let area = width * height;
        if best.is_none_or(|b| area < b.size.0 * b.size.1) {
            let (cu, cv) = ((min_u + max_u) / 2.0, (min_v + max_v) / 2.0);
            let center = (cu * cos - cv * sin, cu * sin + cv * cos);
            best = Some(RotatedRect { center, size: (width, height), angle: edge_angle });
        }
    }

    best
}

/// The four corners of a [`RotatedRect`], for drawing.
#[must_use]
pub fn rotated_rect_points(rect: &RotatedRect) -> [(f64, f64); 4] {
    let (hw, hh) = (rect.size.0 / 2.0, rect.size.1 / 2.0);
    let (sin, cos) = rect.angle.sin_cos();
    let corners = [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)];
    corners.map(|(x, y)| (rect.center.0 + x * cos - y * sin, rect.center.1 + x * sin + y * cos))
}

/// The convex hull of a point set, in counter-clockwise order.
#[must_use]
pub fn convex_hull(points: &[Pixel]) -> Vec<(f64, f64)> {
    let multipoint: MultiPoint<f64> = points.iter().map(|&(x, y)| Point::new(f64::from(x), f64::from(y))).collect();
    let hull = multipoint.convex_hull();
    hull.exterior().points().map(|p| (p.x(), p.y())).collect()
}

/// Approximates a closed contour with Douglas-Peucker simplification at tolerance
/// `epsilon` and returns how many vertices survive, the Rust analogue of
/// `cv2.approxPolyDP(cnt, epsilon, closed=True)` followed by `len(poly)`.
#[must_use]
pub fn simplified_vertex_count(points: &[Pixel], epsilon: f64) -> usize {
    let line: geo::LineString<f64> =
        points.iter().map(|&(x, y)| (f64::from(x), f64::from(y))).collect();
    let simplified = line.simplify(&epsilon);
    // geo closes the ring by repeating the first point; a true closed polygon of n
    // vertices describes itself with n + 1 coordinates.
    simplified.coords_count().saturating_sub(1).max(1)
}

/// The total perimeter of a closed contour, the Rust analogue of `cv2.arcLength(cnt,
/// True)`.
#[must_use]
pub fn arc_length(points: &[Pixel]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    (0..points.len())
        .map(|i| {
            let (x0, y0) = points[i];
            let (x1, y1) = points[(i + 1) % points.len()];
            (f64::from(x1 - x0).powi(2) + f64::from(y1 - y0).powi(2)).sqrt()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disc_points(cx: i32, cy: i32, r: i32) -> Vec<Pixel> {
        let mut points = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    points.push((cx + dx, cy + dy));
                }
            }
        }
        points
    }

    #[test]
    fn square_area_matches_shoelace() {
        let square = [(0, 0), (10, 0), (10, 10), (0, 10)];
        assert_eq!(contour_area(&square), 100.0);
    }

    #[test]
    fn ellipse_fit_centers_on_a_symmetric_disc() {
        let points = disc_points(50, 60, 8);
        let ellipse = fit_ellipse(&points).expect("disc has plenty of points");
        assert!((ellipse.center.0 - 50.0).abs() < 0.5);
        assert!((ellipse.center.1 - 60.0).abs() < 0.5);
        assert!(ellipse.axes.0 > 0.0 && ellipse.axes.1 > 0.0);
    }

    #[test]
    fn fit_ellipse_requires_five_points() {
        assert!(fit_ellipse(&[(0, 0), (1, 1), (2, 2)]).is_none());
    }

    #[test]
    fn min_area_rect_of_an_axis_aligned_rectangle_has_zero_slack() {
        let rect_points = [(0, 0), (20, 0), (20, 10), (0, 10)];
        let fitted = min_area_rect(&rect_points).unwrap();
        assert!((fitted.size.0 * fitted.size.1 - 200.0).abs() < 1e-6);
    }

    #[test]
    fn simplified_vertex_count_collapses_a_near_straight_line() {
        let nearly_straight: Vec<Pixel> = (0..20).map(|i| (i, if i == 10 { 1 } else { 0 })).collect();
        assert!(simplified_vertex_count(&nearly_straight, 5.0) < nearly_straight.len());
    }

    #[test]
    fn a_concave_annulus_contour_needs_more_than_six_vertices_to_approximate() {
        // A coarse approximation of an annulus / star shape: 12 points alternating
        // between two radii around a circle, which Douglas-Peucker can't collapse to
        // <= 6 vertices at a tight epsilon.
        let mut points = Vec::new();
        for i in 0..12 {
            let angle = std::f64::consts::TAU * f64::from(i) / 12.0;
            let radius = if i % 2 == 0 { 40.0 } else { 15.0 };
            points.push((
                (50.0 + radius * angle.cos()).round() as i32,
                (50.0 + radius * angle.sin()).round() as i32,
            ));
        }
        assert!(simplified_vertex_count(&points, 1.0) > 6);
    }
}
