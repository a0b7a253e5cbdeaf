//! Pixel, centimetre and polar coordinate transforms for the robot's downward-facing
//! fisheye camera.
//!
//! The camera's radial distortion is corrected by two fixed polynomials, fitted offline
//! against a checkerboard of known distances. Both polynomials are evaluated with
//! Horner's rule rather than a generic polynomial facility, and are odd-extended so they
//! can be applied to a signed pixel/centimetre offset directly.

/// Degree-6 polynomial mapping a radial pixel distance to centimetres from the robot.
///
/// Coefficients are listed highest-degree first, fitted offline; see the repository's
/// calibration notes for the MSE table that picked degree 6 over lower-degree fits.
const PIXELS_TO_CM_COEFFICIENTS: [f32; 7] = [
    3.417_920_7e-10,
    -1.821_310_8e-7,
    3.864_785_7e-5,
    -4.130_763_6e-3,
    2.334_899_3e-1,
    -6.222_445_3,
    6.435_279_4e1,
];

/// Degree-3 polynomial mapping a radial centimetre distance back to pixels.
///
/// Independently fitted from [`PIXELS_TO_CM_COEFFICIENTS`], so round-tripping through
/// both polynomials only agrees up to fit residual, not exactly.
const CM_TO_PIXELS_COEFFICIENTS: [f32; 4] = [6.664_016_2e-5, -2.508_933_9e-2, 3.286_395_4, 1.859_429_2e1];

/// Evaluates a polynomial given highest-degree-first coefficients using Horner's rule.
fn horner(coefficients: &[f32], x: f32) -> f32 {
    coefficients.iter().fold(0.0, |acc, &c| acc * x + c)
}

/// Evaluates `f` on `|x|` and flips the sign back, so a fixed calibration polynomial
/// behaves sanely on signed pixel/centimetre offsets instead of only on the unsigned
/// radial distance it was fitted against.
fn odd_extend(f: impl Fn(f32) -> f32, x: f32) -> f32 {
    if x >= 0.0 { f(x) } else { -f(-x) }
}

/// Converts a radial pixel distance from the frame center to centimetres from the
/// robot's body, using the degree-6 calibration fit.
#[must_use]
pub fn pixels_to_cm(r: f32) -> f32 {
    odd_extend(|x| horner(&PIXELS_TO_CM_COEFFICIENTS, x), r)
}

/// Converts a radial centimetre distance from the robot's body to pixels from the frame
/// center, using the degree-3 calibration fit.
#[must_use]
pub fn cm_to_pixels(d: f32) -> f32 {
    odd_extend(|x| horner(&CM_TO_PIXELS_COEFFICIENTS, x), d)
}

/// Converts a relative Cartesian offset `(dx, dy)` (pixels or centimetres, whichever
/// space the caller is working in) to polar `(bearing, distance)`.
///
/// Bearing is in degrees, 0° pointing "up" (robot forward), positive clockwise,
/// normalized into `(-180, 180]`. This convention is deliberately unusual; document it
/// at every boundary that crosses into firmware.
#[must_use]
pub fn cartesian_to_polar(dx: f32, dy: f32) -> (f32, f32) {
    let raw_angle = dy.atan2(dx).to_degrees();
    let mut bearing = -raw_angle + 90.0;
    if bearing > 180.0 {
        bearing -= 360.0;
    }

    let distance = dx.hypot(dy);

    (bearing, distance)
}

/// Converts polar `(bearing, distance)` back to a relative Cartesian offset `(dx, dy)`,
/// the inverse of [`cartesian_to_polar`].
#[must_use]
pub fn polar_to_cartesian(bearing: f32, distance: f32) -> (f32, f32) {
    let radians = bearing.to_radians();
    (distance * radians.sin(), distance * radians.cos())
}

/// Maps a pixel position within a `frame_shape` (width, height) raster to a polar
/// `(bearing, distance_cm)` position relative to the robot's body.
#[must_use]
pub fn map_pixels_to_cm(frame_shape: (f32, f32), x: f32, y: f32) -> (f32, f32) {
    let (width, height) = frame_shape;
    let dx = x - width / 2.0;
    let dy = height / 2.0 - y;

    let (bearing, distance_px) = cartesian_to_polar(dx, dy);
    (bearing, pixels_to_cm(distance_px))
}

/// Maps a polar `(bearing, distance_cm)` position to a pixel position within a
/// `frame_shape` (width, height) raster, the inverse of [`map_pixels_to_cm`].
#[must_use]
pub fn map_cm_to_pixels(frame_shape: (f32, f32), bearing: f32, distance_cm: f32) -> (f32, f32) {
    let (width, height) = frame_shape;
    let distance_px = cm_to_pixels(distance_cm);
    let (dx, dy) = polar_to_cartesian(bearing, distance_px);

    (dx + width / 2.0, height / 2.0 - dy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f32, b: f32, tol: f32) {
        assert!((a - b).abs() <= tol, "expected {a} to be within {tol} of {b}");
    }

    #[test]
    fn bearing_stays_in_normalized_range() {
        for raw in [-400.0, -181.0, -180.0, -1.0, 0.0, 1.0, 90.0, 179.0, 180.0, 181.0, 400.0] {
            let (bearing, _) = cartesian_to_polar(raw.to_radians().cos(), raw.to_radians().sin());
            assert!(bearing > -180.0 && bearing <= 180.0, "bearing {bearing} out of range");
        }
    }

    #[test]
    fn zero_is_up_and_positive_is_clockwise() {
        // Straight "up" in image coordinates is (dx=0, dy>0).
        let (bearing, _) = cartesian_to_polar(0.0, 10.0);
        assert_close(bearing, 0.0, 1e-4);

        // A point to image-right of center, (dx>0, dy=0), is 90 degrees clockwise of up.
        let (bearing, _) = cartesian_to_polar(10.0, 0.0);
        assert_close(bearing, 90.0, 1e-4);
    }

    #[test]
    fn polar_cartesian_round_trip() {
        for bearing in [-179.0, -90.0, -1.0, 0.0, 1.0, 90.0, 135.0, 180.0] {
            for distance in [0.0, 1.0, 50.0, 150.0, 299.0] {
                let (dx, dy) = polar_to_cartesian(bearing, distance);
                let (b2, d2) = cartesian_to_polar(dx, dy);

                assert_close(d2, distance, 1e-3);
                if distance > 1e-6 {
                    assert_close(b2, bearing, 1e-2);
                }
            }
        }
    }

    #[test]
    fn pixel_cm_round_trip_within_fit_residual() {
        for distance_px in [0.0, 10.0, 50.0, 100.0, 150.0, 200.0] {
            let cm = pixels_to_cm(distance_px);
            let back_px = cm_to_pixels(cm);
            assert_close(back_px, distance_px, 0.5);
        }
    }

    #[test]
    fn calibration_is_odd_extended() {
        for r in [1.0, 20.0, 90.0, 150.0] {
            assert_close(pixels_to_cm(-r), -pixels_to_cm(r), 1e-4);
            assert_close(cm_to_pixels(-r), -cm_to_pixels(r), 1e-4);
        }
    }

    #[test]
    fn map_pixels_to_cm_matches_known_sample() {
        // A 15x15 disc centered 20px to image-right of a 640x480 frame center.
        let (bearing, distance) = map_pixels_to_cm((640.0, 480.0), 320.0 + 20.0, 240.0);
        assert_close(bearing, 90.0, 1e-3);
        assert_close(distance, pixels_to_cm(20.0), 1e-4);
    }
}
